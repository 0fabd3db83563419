use serde::Serialize;

/// A mailbox as `Display Name <address>`, or just the address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailAddress {
    pub name: Option<String>,
    pub address: String,
}

impl MailAddress {
    pub fn new(address: impl Into<String>) -> Self {
        MailAddress { name: None, address: address.into() }
    }

    pub fn named(name: impl Into<String>, address: impl Into<String>) -> Self {
        MailAddress { name: Some(name.into()), address: address.into() }
    }
}

/// One composed message, handed to a transport and then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: MailAddress,
    pub to: MailAddress,
    pub reply_to: Option<MailAddress>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailReceipt {
    pub message_id: String,
}
