//! Well known property types, ids and named properties
use super::nameid::{Guid, NamedKey, NamedTag};
use super::PropertyId;

// --- Property types ---
/// PtypUnspecified
pub const PT_UNSPECIFIED: u16 = 0x0000;
/// PtypInteger16
pub const PT_I2: u16 = 0x0002;
/// PtypInteger32
pub const PT_LONG: u16 = 0x0003;
/// PtypFloating32
pub const PT_FLOAT: u16 = 0x0004;
/// PtypFloating64
pub const PT_DOUBLE: u16 = 0x0005;
/// PtypErrorCode
pub const PT_ERROR: u16 = 0x000A;
/// PtypBoolean
pub const PT_BOOLEAN: u16 = 0x000B;
/// PtypObject
pub const PT_OBJECT: u16 = 0x000D;
/// PtypInteger64
pub const PT_I8: u16 = 0x0014;
/// PtypString8
pub const PT_STRING8: u16 = 0x001E;
/// PtypString
pub const PT_UNICODE: u16 = 0x001F;
/// PtypTime
pub const PT_SYSTIME: u16 = 0x0040;
/// PtypGuid
pub const PT_CLSID: u16 = 0x0048;
/// PtypBinary
pub const PT_BINARY: u16 = 0x0102;
/// PtypMultipleString8
pub const PT_MV_STRING8: u16 = 0x101E;
/// PtypMultipleString
pub const PT_MV_UNICODE: u16 = 0x101F;
/// PtypMultipleBinary
pub const PT_MV_BINARY: u16 = 0x1102;

/// Whether values of this type live in their own stream or storage
pub fn is_variable_length(ptype: u16) -> bool {
    matches!(
        ptype,
        PT_OBJECT
            | PT_STRING8
            | PT_UNICODE
            | PT_CLSID
            | PT_BINARY
            | PT_MV_STRING8
            | PT_MV_UNICODE
            | PT_MV_BINARY
    )
}

// --- Message ---
/// PidTagMessageClass
pub const MESSAGE_CLASS: PropertyId = PropertyId(0x001A);
/// PidTagSubject
pub const SUBJECT: PropertyId = PropertyId(0x0037);
/// PidTagClientSubmitTime
pub const CLIENT_SUBMIT_TIME: PropertyId = PropertyId(0x0039);
/// PidTagMessageDeliveryTime
pub const MESSAGE_DELIVERY_TIME: PropertyId = PropertyId(0x0E06);
/// PidTagProviderSubmitTime
pub const PROVIDER_SUBMIT_TIME: PropertyId = PropertyId(0x0048);
/// PidTagTransportMessageHeaders
pub const TRANSPORT_MESSAGE_HEADERS: PropertyId = PropertyId(0x007D);
/// PidTagBody
pub const BODY: PropertyId = PropertyId(0x1000);
/// PidTagRtfCompressed
pub const RTF_COMPRESSED: PropertyId = PropertyId(0x1009);
/// PidTagHtml
pub const BODY_HTML: PropertyId = PropertyId(0x1013);
/// PidTagFlagStatus
pub const FLAG_STATUS: PropertyId = PropertyId(0x1090);
/// PidTagFlagCompleteTime
pub const FLAG_COMPLETE_TIME: PropertyId = PropertyId(0x1091);
/// PidTagInternetCodepage
pub const INTERNET_CODEPAGE: PropertyId = PropertyId(0x3FDE);
/// PidTagMessageCodepage
pub const MESSAGE_CODEPAGE: PropertyId = PropertyId(0x3FFD);

// --- Sender ---
/// PidTagSenderName
pub const SENDER_NAME: PropertyId = PropertyId(0x0C1A);
/// PidTagSenderEmailAddress
pub const SENDER_EMAIL_ADDRESS: PropertyId = PropertyId(0x0C1F);
/// PidTagSenderSmtpAddress
pub const SENDER_SMTP_ADDRESS: PropertyId = PropertyId(0x5D01);

// --- Recipient ---
/// PidTagRecipientType
pub const RECIPIENT_TYPE: PropertyId = PropertyId(0x0C15);
/// PidTagDisplayName
pub const DISPLAY_NAME: PropertyId = PropertyId(0x3001);
/// PidTagEmailAddress
pub const EMAIL_ADDRESS: PropertyId = PropertyId(0x3003);
/// PidTagSmtpAddress
pub const SMTP_ADDRESS: PropertyId = PropertyId(0x39FE);

// --- Attachment ---
/// PidTagAttachDataBinary / PidTagAttachDataObject
pub const ATTACH_DATA: PropertyId = PropertyId(0x3701);
/// PidTagAttachFilename
pub const ATTACH_FILENAME: PropertyId = PropertyId(0x3704);
/// PidTagAttachMethod
pub const ATTACH_METHOD: PropertyId = PropertyId(0x3705);
/// PidTagAttachLongFilename
pub const ATTACH_LONG_FILENAME: PropertyId = PropertyId(0x3707);
/// PidTagRenderingPosition
pub const RENDERING_POSITION: PropertyId = PropertyId(0x370B);
/// PidTagAttachMimeTag
pub const ATTACH_MIME_TAG: PropertyId = PropertyId(0x370E);
/// PidTagAttachContentId
pub const ATTACH_CONTENT_ID: PropertyId = PropertyId(0x3712);
/// PidTagCreationTime
pub const CREATION_TIME: PropertyId = PropertyId(0x3007);
/// PidTagLastModificationTime
pub const LAST_MODIFICATION_TIME: PropertyId = PropertyId(0x3008);
/// PidTagAttachmentHidden
pub const ATTACHMENT_HIDDEN: PropertyId = PropertyId(0x7FFE);

/// `AttachMethod` value of an embedded message
pub const ATTACH_EMBEDDED_MSG: i32 = 5;

// --- Property sets ---
/// PS_MAPI
pub const PS_MAPI: Guid = Guid::from_fields(
    0x00020328,
    0,
    0,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);
/// PS_PUBLIC_STRINGS
pub const PS_PUBLIC_STRINGS: Guid = Guid::from_fields(
    0x00020329,
    0,
    0,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);
/// PSETID_Common
pub const PSETID_COMMON: Guid = Guid::from_fields(
    0x00062008,
    0,
    0,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);
/// PSETID_Task
pub const PSETID_TASK: Guid = Guid::from_fields(
    0x00062003,
    0,
    0,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);

// --- Named properties ---
/// PidLidFlagRequest
pub const FLAG_REQUEST: NamedTag = NamedTag::lid(PSETID_COMMON, 0x8530);
/// PidLidTaskStatus
pub const TASK_STATUS: NamedTag = NamedTag::lid(PSETID_TASK, 0x8101);
/// PidLidTaskStartDate
pub const TASK_START_DATE: NamedTag = NamedTag::lid(PSETID_TASK, 0x8104);
/// PidLidTaskDueDate
pub const TASK_DUE_DATE: NamedTag = NamedTag::lid(PSETID_TASK, 0x8105);
/// PidLidTaskComplete
pub const TASK_COMPLETE: NamedTag = NamedTag::lid(PSETID_TASK, 0x811C);
/// PidNameKeywords (categories)
pub const KEYWORDS: NamedTag = NamedTag {
    guid: PS_PUBLIC_STRINGS,
    key: NamedKey::Name("Keywords"),
};
