#![warn(missing_docs)]
//! Outlook MSG parser
//!
//! A property resolver and entity tree for Outlook MSG documents, with the
//! ability to save any message of the tree (including embedded ones) as a
//! standalone document
//!
//! The main interface is [`Message`]; everything is built on top of a
//! [`Session`] wrapping a [`ContainerProvider`]
pub mod catalog;
pub mod cfb_provider;
pub mod crtf;
mod error;
pub mod handles;
pub mod headers;
pub mod props;
pub mod provider;
mod save;
pub mod text;

pub use cfb_provider::CfbProvider;
pub use error::MsgError;
pub use handles::{Handle, Session};
pub use headers::InternetHeaders;
pub use props::{Properties, PropertyId, PropertyValue, TableHeader};
pub use provider::{ContainerProvider, ElementInfo, ElementKind, HandleId};
pub use save::promote_property_table;

use catalog::ElementCatalog;
use lazy_static::lazy_static;
use props::nameid::NameIdMap;
use props::SUBSTG_PREFIX;
use props::tags::*;
use regex::Regex;
use std::rc::Rc;
use time::OffsetDateTime;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

/// Name prefix of recipient storages
pub const RECIPIENT_PREFIX: &str = "__recip_version1.0_";
/// Name prefix of attachment storages
pub const ATTACHMENT_PREFIX: &str = "__attach_version1.0_";

/// Returns the transport headers, Unicode version first
fn transport_headers<P: ContainerProvider>(
    props: &Properties<P>,
) -> Result<Option<String>, MsgError> {
    for ptype in [PT_UNICODE, PT_STRING8] {
        if let Some(PropertyValue::String(s)) =
            props.resolve_as(TRANSPORT_MESSAGE_HEADERS, ptype)?
        {
            if !s.trim().is_empty() {
                return Ok(Some(s));
            }
        }
    }
    Ok(None)
}

/// Picks an e-mail address among candidates in order of preference
///
/// The first candidate which looks like an address wins; otherwise
/// `fallback` is tried; otherwise the first non empty candidate is returned
fn pick_email<F>(candidates: &[Option<String>], fallback: F) -> Result<Option<String>, MsgError>
where
    F: FnOnce() -> Result<Option<String>, MsgError>,
{
    let mut present = candidates
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());
    if let Some(addr) = present.clone().find(|s| s.contains('@')) {
        return Ok(Some(addr.to_string()));
    }
    if let Some(addr) = fallback()? {
        return Ok(Some(addr));
    }
    Ok(present.next().map(str::to_string))
}

/// Extracts the address of the `From:` header from a raw header block
fn email_from_headers(raw: &str) -> Option<String> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"From:.*<(?P<email>.*?)>").unwrap();
    }
    RE.captures(raw)
        .and_then(|caps| caps.name("email"))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The sender of a [`Message`]
///
/// A view over the message's own storage
pub struct Sender<P: ContainerProvider> {
    props: Properties<P>,
}

impl<P: ContainerProvider> Sender<P> {
    /// The sender properties
    pub fn properties(&self) -> &Properties<P> {
        &self.props
    }

    /// The sender display name
    pub fn display_name(&self) -> Result<Option<String>, MsgError> {
        self.props.string(SENDER_NAME)
    }

    /// The sender e-mail address
    ///
    /// When none of the address properties looks like an address, the
    /// `From:` transport header is scanned. If that yields nothing either,
    /// the first non empty address property is returned as is (for example
    /// an Exchange DN)
    pub fn email(&self) -> Result<Option<String>, MsgError> {
        let candidates = [
            self.props.string(SENDER_EMAIL_ADDRESS)?,
            self.props.string(SENDER_SMTP_ADDRESS)?,
        ];
        pick_email(&candidates, || {
            Ok(transport_headers(&self.props)?.and_then(|raw| email_from_headers(&raw)))
        })
    }
}

/// A type of recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientType {
    /// To
    To,
    /// CC
    Cc,
    /// BCC
    Bcc,
    /// Invalid or unknown type
    Unknown,
}

impl RecipientType {
    /// Maps a `PR_RECIPIENT_TYPE` value
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(1) => Self::To,
            Some(2) => Self::Cc,
            Some(3) => Self::Bcc,
            _ => Self::Unknown,
        }
    }

    /// Return the type as a `str`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::To => "To",
            Self::Cc => "Cc",
            Self::Bcc => "Bcc",
            Self::Unknown => "",
        }
    }
}

/// A message recipient
pub struct Recipient<P: ContainerProvider> {
    props: Properties<P>,
}

impl<P: ContainerProvider> Recipient<P> {
    /// The recipient properties
    pub fn properties(&self) -> &Properties<P> {
        &self.props
    }

    /// The recipient display name
    pub fn display_name(&self) -> Result<Option<String>, MsgError> {
        self.props.string(DISPLAY_NAME)
    }

    /// The recipient e-mail address
    pub fn email(&self) -> Result<Option<String>, MsgError> {
        let candidates = [
            self.props.string(SMTP_ADDRESS)?,
            self.props.string(EMAIL_ADDRESS)?,
        ];
        pick_email(&candidates, || Ok(None))
    }

    /// The type of recipient
    pub fn kind(&self) -> Result<RecipientType, MsgError> {
        Ok(RecipientType::from_code(self.props.int32(RECIPIENT_TYPE)?))
    }
}

/// Message *attachment*
///
/// Note: these are not necessarily MIME parts or actual attachments
pub struct Attachment<P: ContainerProvider> {
    props: Properties<P>,
}

impl<P: ContainerProvider> Attachment<P> {
    /// The attachment properties
    pub fn properties(&self) -> &Properties<P> {
        &self.props
    }

    /// The file name: long name, short name, display name, or empty
    pub fn filename(&self) -> Result<String, MsgError> {
        for id in [ATTACH_LONG_FILENAME, ATTACH_FILENAME, DISPLAY_NAME] {
            if let Some(name) = self.props.string(id)? {
                if !name.is_empty() {
                    return Ok(name);
                }
            }
        }
        Ok(String::new())
    }

    /// The display name
    pub fn display_name(&self) -> Result<Option<String>, MsgError> {
        self.props.string(DISPLAY_NAME)
    }

    /// The attachment content
    pub fn data(&self) -> Result<Option<Vec<u8>>, MsgError> {
        match self.props.resolve_as(ATTACH_DATA, PT_BINARY)? {
            Some(PropertyValue::Binary(data)) => Ok(Some(data)),
            Some(other) => Err(MsgError::PropertyTypeMismatch {
                id: ATTACH_DATA,
                expected: "binary",
                found: other.kind(),
            }),
            None => Ok(None),
        }
    }

    /// The content id (for inline attachments)
    pub fn content_id(&self) -> Result<Option<String>, MsgError> {
        self.props.string(ATTACH_CONTENT_ID)
    }

    /// The MIME type
    pub fn mime_type(&self) -> Result<Option<String>, MsgError> {
        self.props.string(ATTACH_MIME_TAG)
    }

    /// The position of the attachment in the rendered body
    pub fn rendering_position(&self) -> Result<Option<i32>, MsgError> {
        self.props.int32(RENDERING_POSITION)
    }

    /// The `PR_ATTACH_METHOD` value
    pub fn attach_method(&self) -> Result<Option<i32>, MsgError> {
        self.props.int32(ATTACH_METHOD)
    }

    /// Whether the attachment is hidden
    pub fn is_hidden(&self) -> Result<bool, MsgError> {
        Ok(self.props.boolean(ATTACHMENT_HIDDEN)?.unwrap_or(false))
    }

    /// The creation time
    pub fn creation_time(&self) -> Result<Option<OffsetDateTime>, MsgError> {
        self.props.datetime(CREATION_TIME)
    }

    /// The last modification time
    pub fn modification_time(&self) -> Result<Option<OffsetDateTime>, MsgError> {
        self.props.datetime(LAST_MODIFICATION_TIME)
    }
}

/// An entry of [`Message::attachments`]
pub enum AttachmentItem<P: ContainerProvider> {
    /// A plain attachment
    Leaf(Attachment<P>),
    /// An attached message
    Embedded(Box<Message<P>>),
}

impl<P: ContainerProvider> AttachmentItem<P> {
    /// Returns the plain attachment, if this is one
    pub fn as_attachment(&self) -> Option<&Attachment<P>> {
        match self {
            Self::Leaf(a) => Some(a),
            Self::Embedded(_) => None,
        }
    }

    /// Returns the embedded message, if this is one
    pub fn as_message(&self) -> Option<&Message<P>> {
        match self {
            Self::Leaf(_) => None,
            Self::Embedded(m) => Some(m),
        }
    }
}

/// Follow-up flag status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStatus {
    /// Follow-up complete
    Complete,
    /// Flagged for follow-up
    Marked,
    /// Any other value
    Other(i32),
}

/// The follow-up flag of a [`Message`]
pub struct Flag<P: ContainerProvider> {
    props: Properties<P>,
    request: String,
}

impl<P: ContainerProvider> Flag<P> {
    /// The requested action (e.g. "Follow up")
    pub fn request(&self) -> &str {
        &self.request
    }

    /// The flag status
    pub fn status(&self) -> Result<Option<FlagStatus>, MsgError> {
        Ok(self.props.int32(FLAG_STATUS)?.map(|v| match v {
            1 => FlagStatus::Complete,
            2 => FlagStatus::Marked,
            v => FlagStatus::Other(v),
        }))
    }
}

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Not started
    NotStarted,
    /// In progress
    InProgress,
    /// Complete
    Complete,
    /// Waiting on someone else
    Waiting,
    /// Deferred
    Deferred,
    /// Any other value
    Other(i32),
}

/// The task data of a flagged [`Message`]
pub struct Task<P: ContainerProvider> {
    props: Properties<P>,
}

impl<P: ContainerProvider> Task<P> {
    /// The start date
    pub fn start_date(&self) -> Result<Option<OffsetDateTime>, MsgError> {
        self.props.named(&TASK_START_DATE, Properties::datetime)
    }

    /// The due date
    pub fn due_date(&self) -> Result<Option<OffsetDateTime>, MsgError> {
        self.props.named(&TASK_DUE_DATE, Properties::datetime)
    }

    /// The task status
    pub fn status(&self) -> Result<Option<TaskStatus>, MsgError> {
        Ok(self
            .props
            .named(&TASK_STATUS, Properties::int32)?
            .map(|v| match v {
                0 => TaskStatus::NotStarted,
                1 => TaskStatus::InProgress,
                2 => TaskStatus::Complete,
                3 => TaskStatus::Waiting,
                4 => TaskStatus::Deferred,
                v => TaskStatus::Other(v),
            }))
    }

    /// Whether the task is complete
    pub fn complete(&self) -> Result<Option<bool>, MsgError> {
        self.props.named(&TASK_COMPLETE, Properties::boolean)
    }

    /// When the task was completed
    pub fn complete_time(&self) -> Result<Option<OffsetDateTime>, MsgError> {
        self.props.datetime(FLAG_COMPLETE_TIME)
    }
}

/// The position of a message in its tree
pub(crate) struct Lineage<P: ContainerProvider> {
    pub(crate) handle: Handle<P>,
    pub(crate) catalog: Rc<ElementCatalog>,
    pub(crate) parent: Option<Rc<Lineage<P>>>,
}

impl<P: ContainerProvider> Lineage<P> {
    /// The top-level message of the tree
    pub(crate) fn root(&self) -> &Lineage<P> {
        let mut node = self;
        while let Some(parent) = &node.parent {
            node = parent.as_ref();
        }
        node
    }
}

/// Outlook message
///
/// Either the top-level message of a document or a message embedded in an
/// attachment
pub struct Message<P: ContainerProvider> {
    // Children are declared first so that they are released before the
    // message's own handle
    attachments: Vec<AttachmentItem<P>>,
    recipients: Vec<Recipient<P>>,
    sender: Sender<P>,
    headers: Option<InternetHeaders>,
    lineage: Rc<Lineage<P>>,
    props: Properties<P>,
}

impl Message<CfbProvider> {
    /// Parses a document with a fresh [`CfbProvider`] session
    pub fn open(data: &[u8]) -> Result<Self, MsgError> {
        Self::from_bytes(&Session::new(CfbProvider::new()), data)
    }
}

impl<P: ContainerProvider> Message<P> {
    /// Parses a document
    #[instrument(level = "debug", skip_all, fields(len = data.len()))]
    pub fn from_bytes(session: &Session<P>, data: &[u8]) -> Result<Self, MsgError> {
        let handle = session
            .acquire(|p| p.open(data))
            .map_err(|e| MsgError::read("/", e))?;
        Self::build(handle, "/".to_string(), None)
    }

    fn build(
        handle: Handle<P>,
        path: String,
        parent: Option<(Rc<Lineage<P>>, &Properties<P>)>,
    ) -> Result<Self, MsgError> {
        debug!("Loading message {path}");
        let catalog = Rc::new(ElementCatalog::build(&handle, &path)?);
        let (names, header, inherited_cp) = match &parent {
            Some((_, props)) => (
                props.names().clone(),
                TableHeader::Embedded,
                Some(props.codepage()),
            ),
            None => (
                Rc::new(NameIdMap::load(&handle, &catalog)?),
                TableHeader::TopLevel,
                None,
            ),
        };
        let props = Properties::new(handle.clone(), catalog.clone(), header, names.clone())?;
        let codepage = match props.int32(MESSAGE_CODEPAGE)? {
            Some(cp) => Some(cp),
            None => props.int32(INTERNET_CODEPAGE)?,
        }
        .and_then(|cp| u16::try_from(cp).ok())
        .or(inherited_cp)
        .unwrap_or(1252);
        let props = props.with_codepage(codepage);

        let sender = Sender {
            props: props.clone(),
        };
        let headers = transport_headers(&props)?
            .map(|raw| handle.session().header_parser().parse(&raw));
        let lineage = Rc::new(Lineage {
            handle: handle.clone(),
            catalog: catalog.clone(),
            parent: parent.map(|(lineage, _)| lineage),
        });

        let mut recipients = Vec::new();
        let mut attachments = Vec::new();
        for entry in catalog.sub_containers() {
            let child_path = format!("{path}{}/", entry.name);
            let sub_entity = |source| MsgError::SubEntity {
                element: child_path.clone(),
                source: Box::new(source),
            };
            if entry.name.starts_with(RECIPIENT_PREFIX) {
                let props = open_child(&handle, &entry.name, &child_path, &names, codepage)
                    .map_err(sub_entity)?;
                recipients.push(Recipient { props });
            } else if entry.name.starts_with(ATTACHMENT_PREFIX) {
                let props = open_child(&handle, &entry.name, &child_path, &names, codepage)
                    .map_err(sub_entity)?;
                let item = Self::attachment_item(Attachment { props }, &child_path, &lineage)
                    .map_err(sub_entity)?;
                attachments.push(item);
            } else {
                debug!("Skipping storage {child_path}");
            }
        }
        debug!(
            "Message {path}: {} recipient(s), {} attachment(s)",
            recipients.len(),
            attachments.len()
        );

        Ok(Self {
            attachments,
            recipients,
            sender,
            headers,
            lineage,
            props,
        })
    }

    fn attachment_item(
        attachment: Attachment<P>,
        path: &str,
        lineage: &Rc<Lineage<P>>,
    ) -> Result<AttachmentItem<P>, MsgError> {
        if attachment.attach_method()? != Some(ATTACH_EMBEDDED_MSG) {
            return Ok(AttachmentItem::Leaf(attachment));
        }
        match attachment.props.object(ATTACH_DATA)? {
            Some(object) => {
                let path = format!("{path}{SUBSTG_PREFIX}{ATTACH_DATA}{PT_OBJECT:04X}/");
                let message =
                    Self::build(object, path, Some((lineage.clone(), &attachment.props)))?;
                Ok(AttachmentItem::Embedded(Box::new(message)))
            }
            None => {
                warn!("Embedded message attachment {path} has no message object");
                Ok(AttachmentItem::Leaf(attachment))
            }
        }
    }

    /// The message properties
    pub fn properties(&self) -> &Properties<P> {
        &self.props
    }

    /// The path of the message within its original document
    pub fn path(&self) -> &str {
        self.props.path()
    }

    /// Whether this is the top-level message of its document
    pub fn is_root(&self) -> bool {
        self.lineage.parent.is_none()
    }

    pub(crate) fn lineage(&self) -> &Lineage<P> {
        &self.lineage
    }

    /// The code page used to decode narrow strings
    pub fn codepage(&self) -> u16 {
        self.props.codepage()
    }

    /// The message class (e.g. `IPM.Note`)
    pub fn message_class(&self) -> Result<Option<String>, MsgError> {
        self.props.string(MESSAGE_CLASS)
    }

    /// The subject
    pub fn subject(&self) -> Result<Option<String>, MsgError> {
        self.props.string(SUBJECT)
    }

    /// The sender
    pub fn sender(&self) -> &Sender<P> {
        &self.sender
    }

    /// The parsed transport headers, if any
    pub fn headers(&self) -> Option<&InternetHeaders> {
        self.headers.as_ref()
    }

    /// The recipients, in storage order
    pub fn recipients(&self) -> &[Recipient<P>] {
        &self.recipients
    }

    /// The attachments, in storage order
    pub fn attachments(&self) -> &[AttachmentItem<P>] {
        &self.attachments
    }

    /// The plain text body
    pub fn body(&self) -> Result<Option<String>, MsgError> {
        self.props.string(BODY)
    }

    /// The decompressed RTF body
    ///
    /// Bodies which fail to decompress are reported as absent
    pub fn rtf_body(&self) -> Result<Option<Vec<u8>>, MsgError> {
        let Some(compressed) = self.props.bytes(RTF_COMPRESSED)? else {
            return Ok(None);
        };
        match self.props.handle().session().rtf().decompress(&compressed) {
            Ok(rtf) => Ok(Some(rtf)),
            Err(e) => {
                warn!("Failed to decompress the RTF body of {}: {e}", self.path());
                Ok(None)
            }
        }
    }

    /// The HTML body
    ///
    /// Falls back to the HTML encapsulated in the RTF body
    pub fn html_body(&self) -> Result<Option<String>, MsgError> {
        match self.props.resolve(BODY_HTML)? {
            Some(PropertyValue::String(s)) => return Ok(Some(s)),
            Some(PropertyValue::Binary(b)) => {
                return Ok(Some(text::decode_codepage(&b, self.codepage())));
            }
            Some(other) => {
                return Err(MsgError::PropertyTypeMismatch {
                    id: BODY_HTML,
                    expected: "string",
                    found: other.kind(),
                });
            }
            None => {}
        }
        let Some(rtf) = self.rtf_body()? else {
            return Ok(None);
        };
        Ok(self
            .props
            .handle()
            .session()
            .rtf()
            .html_from_rtf(&rtf)
            .filter(|html| !html.is_empty()))
    }

    /// When the message was sent
    pub fn sent_on(&self) -> Result<Option<OffsetDateTime>, MsgError> {
        for id in [PROVIDER_SUBMIT_TIME, CLIENT_SUBMIT_TIME] {
            if let Some(t) = self.props.datetime(id)? {
                return Ok(Some(t));
            }
        }
        Ok(self.headers.as_ref().and_then(|h| h.date))
    }

    /// When the message was received
    pub fn received_on(&self) -> Result<Option<OffsetDateTime>, MsgError> {
        if let Some(t) = self.props.datetime(MESSAGE_DELIVERY_TIME)? {
            return Ok(Some(t));
        }
        Ok(self.headers.as_ref().and_then(|h| h.first_received()))
    }

    /// The categories (keywords) assigned to the message
    pub fn categories(&self) -> Result<Option<Vec<String>>, MsgError> {
        self.props.named(&KEYWORDS, Properties::strings)
    }

    /// The follow-up flag, if the message is flagged
    pub fn flag(&self) -> Result<Option<Flag<P>>, MsgError> {
        let request = self.props.named(&FLAG_REQUEST, Properties::string)?;
        Ok(request.filter(|r| !r.is_empty()).map(|request| Flag {
            props: self.props.clone(),
            request,
        }))
    }

    /// The task data, if the message is flagged
    pub fn task(&self) -> Result<Option<Task<P>>, MsgError> {
        Ok(self.flag()?.map(|_| Task {
            props: self.props.clone(),
        }))
    }

    /// Releases the message and everything it holds, children first
    pub fn dispose(self) {
        drop(self)
    }
}

fn open_child<P: ContainerProvider>(
    parent: &Handle<P>,
    name: &str,
    path: &str,
    names: &Rc<NameIdMap>,
    codepage: u16,
) -> Result<Properties<P>, MsgError> {
    let handle = parent
        .open_sub_container(name)
        .map_err(|e| MsgError::read(path, e))?;
    Ok(Properties::open(handle, path, TableHeader::Child, names.clone())?.with_codepage(codepage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_types() {
        assert_eq!(RecipientType::from_code(Some(1)), RecipientType::To);
        assert_eq!(RecipientType::from_code(Some(2)), RecipientType::Cc);
        assert_eq!(RecipientType::from_code(Some(3)), RecipientType::Bcc);
        assert_eq!(RecipientType::from_code(Some(0)), RecipientType::Unknown);
        assert_eq!(RecipientType::from_code(Some(-7)), RecipientType::Unknown);
        assert_eq!(RecipientType::from_code(None), RecipientType::Unknown);
    }

    #[test]
    fn from_header() {
        let raw = "Received: from x\r\nFrom: \"Name\" <a@b.com>\r\nTo: <c@d.com>\r\n";
        assert_eq!(email_from_headers(raw).as_deref(), Some("a@b.com"));
        assert_eq!(email_from_headers("From: a@b.com\r\n"), None);
        assert_eq!(email_from_headers("From: Nobody <>\r\n"), None);
    }

    #[test]
    fn email_precedence() -> Result<(), MsgError> {
        let none = || Ok(None);
        let hdr = || Ok(Some("hdr@example.com".to_string()));
        let c = |a: &str, b: &str| [Some(a.to_string()), Some(b.to_string())];
        assert_eq!(
            pick_email(&c("/O=EX/CN=X", "x@example.com"), hdr)?.as_deref(),
            Some("x@example.com")
        );
        assert_eq!(
            pick_email(&c("x@example.com", "y@example.com"), hdr)?.as_deref(),
            Some("x@example.com")
        );
        assert_eq!(
            pick_email(&c("/O=EX/CN=X", ""), hdr)?.as_deref(),
            Some("hdr@example.com")
        );
        assert_eq!(
            pick_email(&c("", "/O=EX/CN=X"), none)?.as_deref(),
            Some("/O=EX/CN=X")
        );
        assert_eq!(pick_email(&[None, None], none)?, None);
        Ok(())
    }
}
