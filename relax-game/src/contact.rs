//! Contact form relay: validation, honeypot, message rendering and hand-off
//! to a mail transport. The SMTP client itself lives behind [`MailTransport`].
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const IMPLICIT_TLS_PORT: u16 = 465;
const SENDER_LABEL: &str = "Portfolio";
const REPLY_SUBJECT: &str = "Re: Votre message — Portfolio";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContactError {
    #[error("Missing fields")]
    MissingFields,
    #[error("invalid relay setting {key}: {value}")]
    InvalidSetting { key: &'static str, value: String },
    #[error("no recipient configured")]
    NoRecipient,
    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// Body of a contact form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
    /// Honeypot; real visitors never see or fill it.
    pub website: String,
}

impl ContactRequest {
    #[must_use]
    pub fn is_bot(&self) -> bool {
        !self.website.is_empty()
    }

    /// # Errors
    ///
    /// Returns [`ContactError::MissingFields`] if name, email or message is blank.
    pub fn validate(&self) -> Result<(), ContactError> {
        if [&self.name, &self.email, &self.message]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ContactError::MissingFields);
        }
        Ok(())
    }
}

/// Request metadata copied into the notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Build from raw header values; the IP is the first `x-forwarded-for` hop.
    #[must_use]
    pub fn from_headers(forwarded_for: Option<&str>, user_agent: Option<&str>) -> Self {
        Self {
            ip: forwarded_for.and_then(first_forwarded_ip),
            user_agent: user_agent
                .map(str::trim)
                .filter(|ua| !ua.is_empty())
                .map(str::to_string),
        }
    }
}

/// First address of an `x-forwarded-for` chain.
#[must_use]
pub fn first_forwarded_ip(header: &str) -> Option<String> {
    header
        .split(',')
        .next()
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

/// SMTP settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            secure: false,
            user: None,
            password: None,
            from: None,
            to: None,
        }
    }
}

impl RelayConfig {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the port is not a number.
    pub fn from_env() -> Result<Self, ContactError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, honouring the legacy variable names.
    ///
    /// # Errors
    ///
    /// Returns an error if the port is not a number.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ContactError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|&key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let host =
            first(&["SMTP_HOST", "MAIL_SERVER"]).unwrap_or_else(|| DEFAULT_SMTP_HOST.into());
        let port = match first(&["SMTP_PORT", "Port"]) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ContactError::InvalidSetting {
                    key: "SMTP_PORT",
                    value: raw.clone(),
                })?,
            None => DEFAULT_SMTP_PORT,
        };
        let secure = first(&["SMTP_SECURE", "Secure"])
            .map_or(port == IMPLICIT_TLS_PORT, |raw| raw.eq_ignore_ascii_case("true"));
        let user = first(&["SMTP_USER", "MAIL_FROM"]);
        let password = first(&["SMTP_PASS", "MAIL_PASSWORD"]);
        let from = first(&["SMTP_FROM"]).or_else(|| user.clone());
        let to = first(&["CONTACT_TO"]).or_else(|| user.clone());

        Ok(Self {
            host,
            port,
            secure,
            user,
            password,
            from,
            to,
        })
    }

    /// Credentials are only sent when both halves are present.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.user.as_deref().zip(self.password.as_deref())
    }
}

/// A rendered notification ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactEmail {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl ContactEmail {
    /// # Errors
    ///
    /// Returns [`ContactError::NoRecipient`] when no recipient is configured.
    pub fn render(
        request: &ContactRequest,
        client: &ClientInfo,
        config: &RelayConfig,
        received_at: DateTime<Utc>,
    ) -> Result<Self, ContactError> {
        let name = request.name.trim();
        let email = request.email.trim();
        let to = config.to.clone().ok_or(ContactError::NoRecipient)?;
        let from_addr = config.from.as_deref().unwrap_or(email);

        let mut text = format!("De: {name} <{email}>\n");
        if let Some(ip) = &client.ip {
            let _ = writeln!(text, "IP: {ip}");
        }
        if let Some(ua) = &client.user_agent {
            let _ = writeln!(text, "UA: {ua}");
        }
        let _ = write!(
            text,
            "Reçu: {}\n\n{}",
            received_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            request.message
        );

        Ok(Self {
            from: format!("\"{SENDER_LABEL}\" <{from_addr}>"),
            to,
            reply_to: email.to_string(),
            subject: format!("📬 Nouveau message — {name}"),
            text,
            html: render_html(request, client, received_at),
        })
    }
}

fn render_html(
    request: &ContactRequest,
    client: &ClientInfo,
    received_at: DateTime<Utc>,
) -> String {
    let name = escape_html(request.name.trim());
    let email = escape_html(request.email.trim());
    let message = escape_html(&request.message);
    let when = received_at.format("%d/%m/%Y %H:%M:%S");
    let reply_href = format!(
        "mailto:{}?subject={}&body={}",
        encode_uri_component(request.email.trim()),
        encode_uri_component(REPLY_SUBJECT),
        encode_uri_component(&format!("Bonjour {},\n\n", request.name.trim()))
    );

    let row = |label: &str, value: &str| {
        format!(
            "<tr><td style=\"padding:6px 0;width:120px;color:#6b7280;font-size:13px;\">{label}</td>\
             <td style=\"padding:6px 0;font-size:14px;\">{value}</td></tr>"
        )
    };
    let mut rows = row("De", &format!("<strong>{name}</strong> &lt;{email}&gt;"));
    rows.push_str(&row("Reçu", &when.to_string()));
    if let Some(ip) = &client.ip {
        rows.push_str(&row("IP", &escape_html(ip)));
    }
    if let Some(ua) = &client.user_agent {
        rows.push_str(&row("Agent", &escape_html(ua)));
    }

    format!(
        "<div style=\"display:none;max-height:0;overflow:hidden;\">Nouveau message de {name} via le portfolio</div>\
         <table role=\"presentation\" width=\"100%\" style=\"background:#f6f9fc;padding:24px 12px;\"><tr><td align=\"center\">\
         <h1 style=\"font-family:Inter,Arial,sans-serif;font-size:18px;\">📬 Nouveau message — Portfolio</h1>\
         <table role=\"presentation\" style=\"width:100%;margin:12px 0 16px 0;\">{rows}</table>\
         <div style=\"white-space:pre-wrap;font-size:14px;line-height:1.6;\">{message}</div>\
         <p><a href=\"{reply_href}\">Répondre à {name}</a></p>\
         </td></tr></table>"
    )
}

/// Escape the five HTML-significant characters.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Percent-encode everything outside the URI-component unreserved set.
#[must_use]
pub fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(char::from(byte)),
            other => {
                let _ = write!(out, "%{other:02X}");
            }
        }
    }
    out
}

/// Outbound mail capability, e.g. an SMTP client.
pub trait MailTransport {
    type Error: std::error::Error;

    /// # Errors
    ///
    /// Returns an error if the message could not be handed off.
    fn send(&self, config: &RelayConfig, email: &ContactEmail) -> Result<(), Self::Error>;
}

/// JSON body and HTTP status returned to the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactResponse {
    #[serde(skip)]
    pub status: u16,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContactResponse {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            status: 200,
            ok: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(status: u16, error: &str) -> Self {
        Self {
            status,
            ok: false,
            error: Some(error.to_string()),
        }
    }
}

/// Handle one submission end to end.
///
/// Honeypot hits succeed silently without sending; blank fields are a 400;
/// rendering or transport failures are a 500.
pub fn handle_contact<T: MailTransport>(
    request: &ContactRequest,
    client: &ClientInfo,
    config: &RelayConfig,
    transport: &T,
    received_at: DateTime<Utc>,
) -> ContactResponse {
    if request.is_bot() {
        log::debug!("contact honeypot filled; dropping submission");
        return ContactResponse::ok();
    }
    if let Err(err) = request.validate() {
        return ContactResponse::failure(400, &err.to_string());
    }
    let sent = ContactEmail::render(request, client, config, received_at).and_then(|email| {
        transport
            .send(config, &email)
            .map_err(|err| ContactError::Transport(err.to_string()))
    });
    match sent {
        Ok(()) => ContactResponse::ok(),
        Err(err) => {
            log::error!("contact relay error: {err}");
            ContactResponse::failure(500, "Server error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Outbox {
        sent: RefCell<Vec<ContactEmail>>,
        fail: bool,
    }

    #[derive(Debug, Error)]
    #[error("connection refused")]
    struct Refused;

    impl MailTransport for Outbox {
        type Error = Refused;

        fn send(&self, _config: &RelayConfig, email: &ContactEmail) -> Result<(), Refused> {
            if self.fail {
                return Err(Refused);
            }
            self.sent.borrow_mut().push(email.clone());
            Ok(())
        }
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn request() -> ContactRequest {
        ContactRequest {
            name: "Ada <admin>".into(),
            email: "ada@example.org".into(),
            message: "Hello & welcome".into(),
            website: String::new(),
        }
    }

    fn config() -> RelayConfig {
        RelayConfig::from_env_with(env(&[
            ("SMTP_USER", "relay@example.org"),
            ("SMTP_PASS", "secret"),
            ("CONTACT_TO", "me@example.org"),
        ]))
        .unwrap()
    }

    #[test]
    fn honeypot_succeeds_without_sending() {
        let outbox = Outbox::default();
        let mut req = request();
        req.website = "http://spam".into();
        let resp = handle_contact(&req, &ClientInfo::default(), &config(), &outbox, Utc::now());
        assert!(resp.ok);
        assert!(outbox.sent.borrow().is_empty());
    }

    #[test]
    fn blank_fields_are_rejected() {
        let outbox = Outbox::default();
        let mut req = request();
        req.message = "   ".into();
        let resp = handle_contact(&req, &ClientInfo::default(), &config(), &outbox, Utc::now());
        assert_eq!(resp.status, 400);
        assert_eq!(resp.error.as_deref(), Some("Missing fields"));
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            serde_json::json!({"ok": false, "error": "Missing fields"})
        );
    }

    #[test]
    fn valid_submission_is_escaped_and_sent() {
        let outbox = Outbox::default();
        let client = ClientInfo::from_headers(Some(" 203.0.113.9 , 10.0.0.1"), Some("curl/8"));
        let resp = handle_contact(&request(), &client, &config(), &outbox, Utc::now());
        assert_eq!(resp, ContactResponse::ok());

        let sent = outbox.sent.borrow();
        let email = &sent[0];
        assert_eq!(email.to, "me@example.org");
        assert_eq!(email.reply_to, "ada@example.org");
        assert_eq!(email.from, "\"Portfolio\" <relay@example.org>");
        assert_eq!(email.subject, "📬 Nouveau message — Ada <admin>");
        assert!(email.text.contains("IP: 203.0.113.9\n"));
        assert!(email.text.contains("UA: curl/8\n"));
        assert!(email.html.contains("Ada &lt;admin&gt;"));
        assert!(email.html.contains("Hello &amp; welcome"));
        assert!(!email.html.contains("<admin>"));
        assert!(email.html.contains(
            "href=\"mailto:ada%40example.org\
             ?subject=Re%3A%20Votre%20message%20%E2%80%94%20Portfolio\
             &body=Bonjour%20Ada%20%3Cadmin%3E%2C%0A%0A\""
        ));
    }

    #[test]
    fn uri_components_keep_only_unreserved_bytes() {
        assert_eq!(encode_uri_component("a-z_0.9!~*'()"), "a-z_0.9!~*'()");
        assert_eq!(encode_uri_component("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode_uri_component("é\""), "%C3%A9%22");
    }

    #[test]
    fn transport_failure_is_a_server_error() {
        let outbox = Outbox {
            fail: true,
            ..Outbox::default()
        };
        let resp = handle_contact(
            &request(),
            &ClientInfo::default(),
            &config(),
            &outbox,
            Utc::now(),
        );
        assert_eq!(resp.status, 500);
        assert_eq!(resp.error.as_deref(), Some("Server error"));
    }

    #[test]
    fn env_fallbacks_and_secure_flag() {
        let cfg = RelayConfig::from_env_with(env(&[])).unwrap();
        assert_eq!(cfg.host, "smtp.gmail.com");
        assert_eq!(cfg.port, 587);
        assert!(!cfg.secure);
        assert!(cfg.credentials().is_none());

        let cfg = RelayConfig::from_env_with(env(&[
            ("MAIL_SERVER", "mail.example.org"),
            ("Port", "465"),
            ("MAIL_FROM", "legacy@example.org"),
            ("MAIL_PASSWORD", "pw"),
        ]))
        .unwrap();
        assert_eq!(cfg.host, "mail.example.org");
        assert!(cfg.secure);
        assert_eq!(cfg.credentials(), Some(("legacy@example.org", "pw")));
        assert_eq!(cfg.to.as_deref(), Some("legacy@example.org"));

        let cfg = RelayConfig::from_env_with(env(&[("SMTP_PORT", "465"), ("SMTP_SECURE", "FALSE")]))
            .unwrap();
        assert!(!cfg.secure);

        assert!(matches!(
            RelayConfig::from_env_with(env(&[("SMTP_PORT", "smtp")])),
            Err(ContactError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn missing_recipient_is_a_server_error() {
        let outbox = Outbox::default();
        let cfg = RelayConfig::from_env_with(env(&[])).unwrap();
        let resp = handle_contact(&request(), &ClientInfo::default(), &cfg, &outbox, Utc::now());
        assert_eq!(resp.status, 500);
    }

    #[test]
    fn forwarded_ip_takes_first_hop() {
        assert_eq!(first_forwarded_ip("1.2.3.4, 5.6.7.8").as_deref(), Some("1.2.3.4"));
        assert_eq!(first_forwarded_ip(" , 5.6.7.8"), None);
        assert_eq!(escape_html("'\""), "&#39;&quot;");
    }
}
