use axum::async_trait;
use tracing::info;

/// Which account action an outbound email authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verify,
    Reset,
}

/// A fully rendered message ready for delivery.
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html: String,
}

/// Email delivery seam. Transport (SMTP, API, ...) lives behind this trait;
/// the flows only ever see `send`.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> anyhow::Result<()>;
}

/// Dev/default sender: logs the message instead of delivering it.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, "mail send stub");
        Ok(())
    }
}

/// Builds the link the recipient clicks. The token goes in verbatim as a
/// query parameter; the front-end page extracts it and POSTs it back.
pub fn action_url(domain: &str, kind: EmailKind, token: &str) -> String {
    let path = match kind {
        EmailKind::Verify => "verifyemail",
        EmailKind::Reset => "reset-password",
    };
    format!("{}/{}?token={}", domain.trim_end_matches('/'), path, token)
}

pub fn build_email(to: &str, from: &str, kind: EmailKind, action_url: &str) -> Email {
    let (subject, intro) = match kind {
        EmailKind::Verify => (
            "Verify your email",
            "Thank you for signing up! Please verify your email address to complete your registration.",
        ),
        EmailKind::Reset => (
            "Reset your password",
            "You requested a password reset. Click the link below to set a new password for your account.",
        ),
    };
    let html = format!(
        "<p>{intro}</p>\
         <p><a href=\"{url}\">{subject}</a></p>\
         <p>If the link doesn't work, copy and paste this into your browser:<br>{url}</p>\
         <p>This link will expire in 1 hour.</p>",
        intro = intro,
        url = action_url,
        subject = subject,
    );
    Email {
        to: to.to_string(),
        from: from.to_string(),
        subject: subject.to_string(),
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_url_points_at_the_right_page() {
        let url = action_url("http://localhost:3000", EmailKind::Verify, "tok123");
        assert_eq!(url, "http://localhost:3000/verifyemail?token=tok123");

        let url = action_url("https://app.example.com/", EmailKind::Reset, "tok456");
        assert_eq!(url, "https://app.example.com/reset-password?token=tok456");
    }

    #[test]
    fn build_email_embeds_link_and_expiry_note() {
        let url = action_url("http://localhost:3000", EmailKind::Reset, "abc");
        let email = build_email("user@example.com", "no-reply@localhost", EmailKind::Reset, &url);
        assert_eq!(email.to, "user@example.com");
        assert_eq!(email.subject, "Reset your password");
        assert!(email.html.contains(&url));
        assert!(email.html.contains("expire in 1 hour"));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let email = build_email("a@b.c", "x@y.z", EmailKind::Verify, "http://x/verifyemail?token=t");
        assert!(LogMailer.send(&email).await.is_ok());
    }
}
