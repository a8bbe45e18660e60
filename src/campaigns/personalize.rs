//! Template personalization — `{{token}}` substitution per recipient.
//!
//! Substitution is literal: `{{name}}`, `{{email}}` and one token per custom
//! field key. Anything else, including `{{name}}` for a contact without a
//! name, is left in the output verbatim.

use std::sync::LazyLock;

use regex::Regex;

use super::model::Campaign;
use crate::contacts::Contact;
use crate::transport::OutgoingEmail;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Resolve the placeholders in `template` against `contact`.
pub fn personalize(template: &str, contact: &Contact) -> String {
    let mut out = template.to_string();

    if let Some(name) = &contact.name {
        out = out.replace("{{name}}", name);
    }
    out = out.replace("{{email}}", &contact.email);

    for (key, value) in &contact.custom_fields {
        let token = format!("{{{{{key}}}}}");
        if out.contains(&token) {
            out = out.replace(&token, &value.to_string());
        }
    }
    out
}

/// Remove every markup tag, keeping the text between tags as-is.
pub fn strip_html(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

/// Build the message one recipient receives for `campaign`.
pub fn render_message(campaign: &Campaign, contact: &Contact) -> OutgoingEmail {
    let html_body = personalize(&campaign.content, contact);
    OutgoingEmail {
        to: contact.email.clone(),
        from: campaign.sender(),
        subject: personalize(&campaign.subject, contact),
        text_body: strip_html(&html_body),
        html_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaigns::model::NewCampaign;
    use crate::contacts::NewContact;

    fn ann() -> Contact {
        NewContact::new("ann@example.com")
            .with_name("Ann")
            .with_field("company", "Acme")
            .into_contact()
    }

    #[test]
    fn unknown_placeholders_pass_through() {
        assert_eq!(personalize("Hi {{name}}, {{missing}}", &ann()), "Hi Ann, {{missing}}");
    }

    #[test]
    fn missing_name_leaves_placeholder() {
        let contact = NewContact::new("bob@example.com").into_contact();
        assert_eq!(
            personalize("Hi {{name}} <{{email}}>", &contact),
            "Hi {{name}} <bob@example.com>"
        );
    }

    #[test]
    fn replaces_every_occurrence_and_custom_fields() {
        let out = personalize("{{name}} at {{company}}; {{name}} again, {{email}}", &ann());
        assert_eq!(out, "Ann at Acme; Ann again, ann@example.com");
    }

    #[test]
    fn non_text_field_values_render_as_text() {
        let contact = NewContact::new("c@example.com")
            .with_field("seats", crate::contacts::FieldValue::Number(12.0))
            .with_field("vip", crate::contacts::FieldValue::Bool(true))
            .into_contact();
        assert_eq!(personalize("{{seats}}/{{vip}}", &contact), "12/true");
    }

    #[test]
    fn substitution_is_literal_not_pattern_based() {
        let contact = NewContact::new("d@example.com")
            .with_field("a.b", "dot")
            .into_contact();
        assert_eq!(personalize("{{a.b}} {{axb}}", &contact), "dot {{axb}}");
    }

    #[test]
    fn personalize_is_deterministic() {
        let contact = ann();
        let template = "Dear {{name}} from {{company}}";
        assert_eq!(personalize(template, &contact), personalize(template, &contact));
    }

    #[test]
    fn strip_html_removes_tags_only() {
        assert_eq!(strip_html("<p>Hello <b>Ann</b></p>"), "Hello Ann");
        assert_eq!(strip_html(r#"<a href="https://x.test">Link</a>"#), "Link");
        assert_eq!(strip_html("No markup"), "No markup");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn render_message_builds_full_payload() {
        let campaign = NewCampaign {
            name: "Launch".into(),
            subject: "Hi {{name}}".into(),
            content: "<h1>Welcome {{name}}</h1><p>{{company}}</p>".into(),
            from_name: "Acme News".into(),
            from_email: "news@acme.test".into(),
        }
        .into_campaign();

        let msg = render_message(&campaign, &ann());
        assert_eq!(msg.to, "ann@example.com");
        assert_eq!(msg.from, "Acme News <news@acme.test>");
        assert_eq!(msg.subject, "Hi Ann");
        assert_eq!(msg.html_body, "<h1>Welcome Ann</h1><p>Acme</p>");
        assert_eq!(msg.text_body, "Welcome AnnAcme");
    }
}
