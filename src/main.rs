mod config;

use msgreader::*;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let config = config::Config::new()?;
    let input: PathBuf = std::env::args_os()
        .nth(1)
        .ok_or("Usage: msgreader <file.msg>")?
        .into();
    let result = process_file(&input, &config)?;
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &result)?;
    writeln!(out)?;
    Ok(())
}

#[derive(Serialize)]
struct MessageRecipient {
    kind: Option<&'static str>,
    name: Option<String>,
    email: Option<String>,
}

impl<P: ContainerProvider> TryFrom<&Recipient<P>> for MessageRecipient {
    type Error = MsgError;

    fn try_from(rcpt: &Recipient<P>) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: match rcpt.kind()? {
                RecipientType::Unknown => None,
                kind => Some(kind.as_str()),
            },
            name: rcpt.display_name()?,
            email: rcpt.email()?,
        })
    }
}

#[derive(Serialize)]
struct MessageAttachment {
    name: String,
    mime_type: Option<String>,
    content_id: Option<String>,
    size: Option<usize>,
    hidden: bool,
}

#[derive(Serialize)]
struct MessageTask {
    status: Option<String>,
    start: Option<String>,
    due: Option<String>,
    complete: Option<bool>,
}

#[derive(Serialize)]
struct MessageFlag {
    request: String,
    status: Option<String>,
    task: Option<MessageTask>,
}

#[derive(Serialize)]
struct Child {
    path: Option<String>,
    symbols: Vec<String>,
}

#[derive(Serialize)]
struct MessageMetadata {
    path: String,
    message_class: Option<String>,
    subject: Option<String>,
    headers: Vec<(String, String)>,
    from: Option<String>,
    recipients: Vec<MessageRecipient>,
    sent_on: Option<String>,
    received_on: Option<String>,
    categories: Vec<String>,
    flag: Option<MessageFlag>,
    has_text_body: bool,
    has_rtf_body: bool,
    has_html_body: bool,
    is_embedded: bool,
    attachments: Vec<MessageAttachment>,
    embedded: Vec<MessageMetadata>,
    children: Vec<Child>,
    symbols: Vec<String>,
}

fn format_time(t: Option<OffsetDateTime>) -> Option<String> {
    t.and_then(|t| t.format(&Rfc3339).ok())
}

struct Extractor<'a> {
    config: &'a config::Config,
    extracted: usize,
    limits_reached: bool,
}

impl Extractor<'_> {
    /// Writes a part to a temporary file, subject to the configured limits
    fn save_child(&mut self, data: &[u8]) -> Result<Child, io::Error> {
        let max_children = usize::try_from(self.config.max_children).unwrap_or(usize::MAX);
        if self.extracted >= max_children {
            self.limits_reached = true;
            return Ok(Child {
                path: None,
                symbols: vec!["LIMITS_REACHED".to_string()],
            });
        }
        self.extracted += 1;
        if u64::try_from(data.len()).unwrap_or(u64::MAX) > self.config.max_child_output_size {
            self.limits_reached = true;
            return Ok(Child {
                path: None,
                symbols: vec!["TOOBIG".to_string()],
            });
        }
        let mut tempf = tempfile::NamedTempFile::new_in(&self.config.output_path)?;
        debug!("Dumping child to {:?}", tempf);
        tempf.write_all(data)?;
        tempf.flush()?;
        let path = tempf
            .into_temp_path()
            .keep()
            .map_err(|e| io::Error::other(format!("Failed to preserve temporary file: {e}")))?
            .into_os_string()
            .into_string()
            .map_err(|s| io::Error::other(format!("Failed to convert OsString {s:?} to String")))?;
        Ok(Child {
            path: Some(path),
            symbols: Vec::new(),
        })
    }

    fn describe<P: ContainerProvider>(
        &mut self,
        msg: &Message<P>,
    ) -> Result<MessageMetadata, Box<dyn std::error::Error>> {
        let mut headers: Vec<(String, String)> = Vec::new();
        if let Some(hdrs) = msg.headers() {
            for (k, v) in &hdrs.fields {
                let klc = k.to_lowercase();
                if [
                    "bcc",
                    "cc",
                    "envelope-to",
                    "from",
                    "in-reply-to",
                    "message-id",
                    "reply-to",
                    "return-path",
                    "subject",
                    "to",
                ]
                .contains(&klc.as_str())
                {
                    headers.push((klc, v.to_string()));
                }
            }
        }
        let sender = msg.sender();
        let from = sender.email()?.map(|email| {
            if let Ok(Some(name)) = sender.display_name() {
                format!("{name} <{email}>")
            } else {
                format!("<{email}>")
            }
        });
        let recipients = msg
            .recipients()
            .iter()
            .map(MessageRecipient::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let flag = match msg.flag()? {
            Some(flag) => {
                let task = match msg.task()? {
                    Some(task) => Some(MessageTask {
                        status: task.status()?.map(|s| format!("{s:?}")),
                        start: format_time(task.start_date()?),
                        due: format_time(task.due_date()?),
                        complete: task.complete()?,
                    }),
                    None => None,
                };
                Some(MessageFlag {
                    request: flag.request().to_string(),
                    status: flag.status()?.map(|s| format!("{s:?}")),
                    task,
                })
            }
            None => None,
        };

        let mut symbols = Vec::new();
        let mut attachments = Vec::new();
        let mut embedded = Vec::new();
        let mut children = Vec::new();
        for item in msg.attachments() {
            match item {
                AttachmentItem::Leaf(attm) => {
                    let name = attm.filename()?;
                    debug!("Processing attachment \"{name}\"");
                    let data = attm.data()?;
                    attachments.push(MessageAttachment {
                        name,
                        mime_type: attm.mime_type()?,
                        content_id: attm.content_id()?,
                        size: data.as_ref().map(Vec::len),
                        hidden: attm.is_hidden()?,
                    });
                }
                AttachmentItem::Embedded(inner) => {
                    if self.config.extract_embedded && !self.limits_reached {
                        match inner.save() {
                            Ok(data) => children.push(self.save_child(&data)?),
                            Err(e) => {
                                warn!("Failed to extract {}: {e}", inner.path());
                                children.push(Child {
                                    path: None,
                                    symbols: vec!["CORRUPTED".to_string()],
                                });
                            }
                        }
                    }
                    embedded.push(self.describe(inner)?);
                }
            }
        }
        if self.limits_reached {
            symbols.push("LIMITS_REACHED".to_string());
        }

        Ok(MessageMetadata {
            path: msg.path().to_string(),
            message_class: msg.message_class()?,
            subject: msg.subject()?,
            headers,
            from,
            recipients,
            sent_on: format_time(msg.sent_on()?),
            received_on: format_time(msg.received_on()?),
            categories: msg.categories()?.unwrap_or_default(),
            flag,
            has_text_body: msg.body()?.is_some(),
            has_rtf_body: msg.rtf_body()?.is_some(),
            has_html_body: msg.html_body()?.is_some(),
            is_embedded: !msg.is_root(),
            attachments,
            embedded,
            children,
            symbols,
        })
    }
}

/// Parses a message file and describes it
#[instrument(level = "error", skip(config))]
fn process_file(
    input: &Path,
    config: &config::Config,
) -> Result<MessageMetadata, Box<dyn std::error::Error>> {
    info!("Parsing {}", input.display());
    let data = std::fs::read(input)?;
    let msg = Message::open(&data)?;
    let mut extractor = Extractor {
        config,
        extracted: 0,
        limits_reached: false,
    };
    extractor.describe(&msg)
}
