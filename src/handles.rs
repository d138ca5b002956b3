//! Handle lifetime tracking
//!
//! Several entity views may alias one provider handle (a [`Sender`](crate::Sender)
//! reads the same storage as its [`Message`](crate::Message)). Each view holds
//! a [`Handle`] guard; guards are reference counted by the [`HandleTracker`]
//! of their [`Session`] and the provider-level release happens once, when the
//! last guard goes away.
use crate::crtf::{DefaultRtfConverter, RtfConverter};
use crate::headers::{HeaderParser, MailHeaderParser};
use crate::provider::{ContainerProvider, HandleId};
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::rc::Rc;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

/// Outcome of [`HandleTracker::release`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Other references remain
    Pending,
    /// This was the last reference: the handle must be released now
    Final,
    /// The handle was not tracked (already released, or never tracked)
    Untracked,
}

/// Reference counts of live handles
#[derive(Debug, Default)]
pub struct HandleTracker {
    refs: HashMap<HandleId, usize>,
}

impl HandleTracker {
    /// Starts tracking a handle with one reference
    ///
    /// Tracking an already tracked handle is a no-op; returns whether the
    /// handle was newly tracked
    pub fn track(&mut self, id: HandleId) -> bool {
        if self.refs.contains_key(&id) {
            false
        } else {
            self.refs.insert(id, 1);
            true
        }
    }

    /// Adds a reference to a tracked handle
    pub fn retain(&mut self, id: HandleId) -> bool {
        match self.refs.get_mut(&id) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    /// Drops a reference
    pub fn release(&mut self, id: HandleId) -> Release {
        match self.refs.get_mut(&id) {
            None => Release::Untracked,
            Some(count) if *count > 1 => {
                *count -= 1;
                Release::Pending
            }
            Some(_) => {
                self.refs.remove(&id);
                Release::Final
            }
        }
    }

    /// Returns the number of references held on a handle
    pub fn references(&self, id: HandleId) -> usize {
        self.refs.get(&id).copied().unwrap_or(0)
    }

    /// Returns the number of distinct live handles
    pub fn live(&self) -> usize {
        self.refs.len()
    }
}

pub(crate) struct SessionInner<P: ContainerProvider> {
    provider: RefCell<P>,
    tracker: RefCell<HandleTracker>,
    rtf: Box<dyn RtfConverter>,
    header_parser: Box<dyn HeaderParser>,
}

/// A message parsing context
///
/// The session owns the container provider, the handle tracker and the
/// external converters. Everything built from a session shares it; it is
/// cheap to clone
pub struct Session<P: ContainerProvider> {
    inner: Rc<SessionInner<P>>,
}

impl<P: ContainerProvider> Clone for Session<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: ContainerProvider> Session<P> {
    /// Creates a session with the default RTF converter and header parser
    pub fn new(provider: P) -> Self {
        Self::with_collaborators(
            provider,
            Box::new(DefaultRtfConverter),
            Box::new(MailHeaderParser),
        )
    }

    /// Creates a session with custom RTF and header collaborators
    pub fn with_collaborators(
        provider: P,
        rtf: Box<dyn RtfConverter>,
        header_parser: Box<dyn HeaderParser>,
    ) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                provider: RefCell::new(provider),
                tracker: RefCell::new(HandleTracker::default()),
                rtf,
                header_parser,
            }),
        }
    }

    /// Returns the number of provider handles currently alive
    pub fn live_handles(&self) -> usize {
        self.inner.tracker.borrow().live()
    }

    /// Grants read access to the provider
    pub fn provider(&self) -> Ref<'_, P> {
        self.inner.provider.borrow()
    }

    /// Runs a provider call which yields a new handle and wraps it into a guard
    pub(crate) fn acquire<F>(&self, f: F) -> io::Result<Handle<P>>
    where
        F: FnOnce(&mut P) -> io::Result<HandleId>,
    {
        let id = f(&mut self.inner.provider.borrow_mut())?;
        Ok(Handle::adopt(self.inner.clone(), id))
    }

    /// Runs a provider call which yields no handle
    pub(crate) fn with_provider<T, F>(&self, f: F) -> io::Result<T>
    where
        F: FnOnce(&mut P) -> io::Result<T>,
    {
        f(&mut self.inner.provider.borrow_mut())
    }

    pub(crate) fn rtf(&self) -> &dyn RtfConverter {
        self.inner.rtf.as_ref()
    }

    pub(crate) fn header_parser(&self) -> &dyn HeaderParser {
        self.inner.header_parser.as_ref()
    }
}

/// A tracked provider handle
///
/// Cloning aliases the handle; dropping the last alias releases it
pub struct Handle<P: ContainerProvider> {
    id: HandleId,
    session: Rc<SessionInner<P>>,
}

impl<P: ContainerProvider> Handle<P> {
    fn adopt(session: Rc<SessionInner<P>>, id: HandleId) -> Self {
        {
            let mut tracker = session.tracker.borrow_mut();
            if !tracker.track(id) {
                // The provider returned a live id: this guard owns one more reference
                tracker.retain(id);
            }
        }
        Self { id, session }
    }

    /// The provider-level id
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The session this handle belongs to
    pub fn session(&self) -> Session<P> {
        Session {
            inner: self.session.clone(),
        }
    }

    fn child<F>(&self, f: F) -> io::Result<Handle<P>>
    where
        F: FnOnce(&mut P, HandleId) -> io::Result<HandleId>,
    {
        let id = f(&mut self.session.provider.borrow_mut(), self.id)?;
        Ok(Handle::adopt(self.session.clone(), id))
    }

    /// Opens a child stream
    pub fn open_stream(&self, name: &str) -> io::Result<Handle<P>> {
        self.child(|p, id| p.open_stream(id, name))
    }

    /// Opens a child container
    pub fn open_sub_container(&self, name: &str) -> io::Result<Handle<P>> {
        self.child(|p, id| p.open_sub_container(id, name))
    }

    /// Creates a child container
    pub fn create_sub_container(&self, name: &str) -> io::Result<Handle<P>> {
        self.child(|p, id| p.create_sub_container(id, name))
    }

    /// Creates a child stream
    pub fn create_stream(&self, name: &str) -> io::Result<Handle<P>> {
        self.child(|p, id| p.create_stream(id, name))
    }

    /// Clones this container into an independent top-level container
    pub fn clone_subtree(&self) -> io::Result<Handle<P>> {
        self.child(|p, id| p.clone_subtree(id))
    }

    /// Reads the whole stream
    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        self.session.provider.borrow_mut().read_all(self.id)
    }

    /// Opens, reads and releases a child stream
    pub fn read_stream(&self, name: &str) -> io::Result<Vec<u8>> {
        self.open_stream(name)?.read_all()
    }
}

impl<P: ContainerProvider> Clone for Handle<P> {
    fn clone(&self) -> Self {
        self.session.tracker.borrow_mut().retain(self.id);
        Self {
            id: self.id,
            session: self.session.clone(),
        }
    }
}

impl<P: ContainerProvider> Drop for Handle<P> {
    fn drop(&mut self) {
        let outcome = self.session.tracker.borrow_mut().release(self.id);
        if outcome != Release::Final {
            return;
        }
        match self.session.provider.try_borrow_mut() {
            Ok(mut provider) => {
                if let Err(e) = provider.release(self.id) {
                    warn!("Failed to release handle {}: {e}", self.id);
                }
            }
            Err(_) => error!("Provider busy, handle {} leaked", self.id),
        }
    }
}

impl<P: ContainerProvider> fmt::Debug for Handle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.id).finish()
    }
}
