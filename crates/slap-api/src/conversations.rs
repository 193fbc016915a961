use std::collections::HashSet;

use slap_types::api::{ContactResponse, MessageResponse};

/// Previews are cut at 40 characters for list display.
pub const PREVIEW_LEN: usize = 40;

/// Shown when the latest message in a thread carries only images.
pub const IMAGE_PLACEHOLDER: &str = "[image]";

/// Fold a user's full message history into one contact per counterpart.
///
/// The input must be ordered newest-first (the store guarantees it), so a
/// single pass keyed on the counterpart keeps exactly the most recent
/// message per contact: first occurrence wins. Messages whose counterpart
/// is the requester itself are discarded. Equal timestamps keep input
/// order; that order is authoritative.
pub fn build_contacts(requester_id: &str, messages: &[MessageResponse]) -> Vec<ContactResponse> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut contacts = Vec::new();

    for msg in messages {
        let counterpart = if msg.sender.id == requester_id {
            &msg.receiver
        } else {
            &msg.sender
        };
        if counterpart.id == requester_id {
            continue;
        }
        if !seen.insert(counterpart.id.as_str()) {
            continue;
        }

        contacts.push(ContactResponse {
            user: counterpart.clone(),
            last_message: preview(msg),
            last_message_at: msg.created_at,
        });
    }

    // Input order already means newest-first; only rows whose timestamp
    // failed to parse move, stably, to the end.
    contacts.sort_by_key(|c| c.last_message_at.is_none());
    contacts
}

fn preview(msg: &MessageResponse) -> String {
    match msg.text_content.as_deref() {
        Some(text) if !text.is_empty() => text.chars().take(PREVIEW_LEN).collect(),
        _ if msg.image_url_1.is_some() || msg.image_url_2.is_some() => {
            IMAGE_PLACEHOLDER.to_string()
        }
        _ => "...".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use slap_types::models::PublicProfile;

    fn profile(id: &str) -> PublicProfile {
        PublicProfile {
            id: id.into(),
            username: id.to_lowercase(),
            name: id.into(),
            profile_image_url: None,
        }
    }

    fn at(t: i64) -> Option<DateTime<Utc>> {
        Some(Utc.timestamp_opt(t, 0).unwrap())
    }

    fn msg(
        id: i64,
        from: &str,
        to: &str,
        text: Option<&str>,
        image: Option<&str>,
        created_at: Option<DateTime<Utc>>,
    ) -> MessageResponse {
        MessageResponse {
            id,
            sender: profile(from),
            receiver: profile(to),
            text_content: text.map(Into::into),
            image_url_1: image.map(Into::into),
            image_url_2: None,
            created_at,
        }
    }

    #[test]
    fn groups_by_counterpart_keeping_most_recent() {
        // Newest-first history for A: an image-only message from C at t=5,
        // then "hi" to B at t=3, then "yo" to B at t=1.
        let history = vec![
            msg(3, "C", "A", None, Some("https://img/1.png"), at(5)),
            msg(2, "A", "B", Some("hi"), None, at(3)),
            msg(1, "A", "B", Some("yo"), None, at(1)),
        ];

        let contacts = build_contacts("A", &history);

        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].user.id, "C");
        assert_eq!(contacts[0].last_message, IMAGE_PLACEHOLDER);
        assert_eq!(contacts[0].last_message_at, at(5));
        assert_eq!(contacts[1].user.id, "B");
        assert_eq!(contacts[1].last_message, "hi");
        assert_eq!(contacts[1].last_message_at, at(3));
    }

    #[test]
    fn one_entry_per_counterpart_with_max_timestamp() {
        let history = vec![
            msg(4, "B", "A", Some("latest"), None, at(40)),
            msg(3, "A", "C", Some("c-side"), None, at(30)),
            msg(2, "A", "B", Some("older"), None, at(20)),
            msg(1, "B", "A", Some("oldest"), None, at(10)),
        ];

        let contacts = build_contacts("A", &history);

        assert_eq!(contacts.len(), 2);
        let b = contacts.iter().find(|c| c.user.id == "B").unwrap();
        assert_eq!(b.last_message, "latest");
        assert_eq!(b.last_message_at, at(40));
    }

    #[test]
    fn preview_truncates_to_forty_chars() {
        let long = "x".repeat(100);
        let history = vec![msg(1, "B", "A", Some(&long), None, at(1))];

        let contacts = build_contacts("A", &history);
        assert_eq!(contacts[0].last_message.chars().count(), PREVIEW_LEN);
    }

    #[test]
    fn preview_never_splits_a_code_point() {
        let text = "héllo wörld çafé résumé naïve ñoño piñata extra";
        let history = vec![msg(1, "B", "A", Some(text), None, at(1))];

        let contacts = build_contacts("A", &history);
        let expected: String = text.chars().take(PREVIEW_LEN).collect();
        assert_eq!(contacts[0].last_message, expected);
    }

    #[test]
    fn empty_text_with_image_uses_placeholder() {
        let history = vec![msg(1, "B", "A", Some(""), Some("https://img/x.png"), at(1))];
        let contacts = build_contacts("A", &history);
        assert_eq!(contacts[0].last_message, IMAGE_PLACEHOLDER);
    }

    #[test]
    fn self_messages_are_discarded() {
        let history = vec![
            msg(2, "A", "A", Some("note to self"), None, at(5)),
            msg(1, "B", "A", Some("real"), None, at(1)),
        ];

        let contacts = build_contacts("A", &history);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].user.id, "B");
    }

    #[test]
    fn empty_history_is_empty_not_an_error() {
        assert!(build_contacts("A", &[]).is_empty());
    }

    #[test]
    fn missing_timestamps_sort_last() {
        let history = vec![
            msg(3, "B", "A", Some("undated"), None, None),
            msg(2, "C", "A", Some("dated"), None, at(5)),
            msg(1, "D", "A", Some("older"), None, at(1)),
        ];

        let contacts = build_contacts("A", &history);
        let ids: Vec<&str> = contacts.iter().map(|c| c.user.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "D", "B"]);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let history = vec![
            msg(2, "B", "A", Some("tied b"), None, at(7)),
            msg(1, "C", "A", Some("tied c"), None, at(7)),
        ];

        let contacts = build_contacts("A", &history);
        let ids: Vec<&str> = contacts.iter().map(|c| c.user.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C"]);
    }
}
