use phantom_types::models::{Message, MessageKind};

/// Outcome of the image visibility check, evaluated before any reveal logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageAccess {
    /// Not an image; the check does not apply.
    NotImage,
    Granted,
    /// The viewer is not on the list. Permanent for this viewer.
    Withheld { allowed: Vec<String> },
}

impl ImageAccess {
    pub fn is_withheld(&self) -> bool {
        matches!(self, Self::Withheld { .. })
    }

    /// Placeholder text shown instead of a withheld image.
    pub fn label(&self) -> Option<String> {
        let Self::Withheld { allowed } = self else {
            return None;
        };
        let handles: Vec<String> = allowed.iter().map(|n| format!("@{}", normalize(n))).collect();
        Some(format!("Image visible only to {}", handles.join(", ")))
    }
}

/// Decide whether `viewer_nickname` may see the image in `message`.
///
/// The sender always sees their own image. An empty allow-list means anyone in
/// the conversation may look. Handle comparison ignores case and a leading `@`.
/// A viewer without a handle cannot match a non-empty list.
pub fn image_access(message: &Message, viewer_id: &str, viewer_nickname: Option<&str>) -> ImageAccess {
    let MessageKind::Image {
        allowed_nicknames, ..
    } = &message.kind
    else {
        return ImageAccess::NotImage;
    };

    if message.is_own(viewer_id) || allowed_nicknames.is_empty() {
        return ImageAccess::Granted;
    }

    let permitted = viewer_nickname
        .map(normalize)
        .filter(|nick| !nick.is_empty())
        .is_some_and(|nick| allowed_nicknames.iter().any(|a| normalize(a) == nick));

    if permitted {
        ImageAccess::Granted
    } else {
        ImageAccess::Withheld {
            allowed: allowed_nicknames.clone(),
        }
    }
}

fn normalize(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo_for(allowed: &[&str]) -> Message {
        let mut msg = Message::text("img1", "carol", "group", "[photo]");
        msg.kind = MessageKind::Image {
            image_url: "https://cdn/p.jpg".into(),
            allowed_nicknames: allowed.iter().map(|s| s.to_string()).collect(),
        };
        msg
    }

    #[test]
    fn listed_viewer_matches_case_insensitively() {
        let msg = photo_for(&["alice"]);
        assert_eq!(image_access(&msg, "u-alice", Some("Alice")), ImageAccess::Granted);
        assert_eq!(image_access(&msg, "u-alice", Some("@alice")), ImageAccess::Granted);
    }

    #[test]
    fn unlisted_viewer_is_withheld() {
        let msg = photo_for(&["alice", "Dave"]);
        let access = image_access(&msg, "u-bob", Some("bob"));
        assert!(access.is_withheld());
        assert_eq!(
            access.label().as_deref(),
            Some("Image visible only to @alice, @dave")
        );
        assert!(image_access(&msg, "u-bob", None).is_withheld());
    }

    #[test]
    fn sender_and_open_images_are_granted() {
        let msg = photo_for(&["alice"]);
        assert_eq!(image_access(&msg, "carol", Some("carol")), ImageAccess::Granted);
        assert_eq!(image_access(&photo_for(&[]), "u-bob", None), ImageAccess::Granted);
    }

    #[test]
    fn text_is_not_subject_to_the_check() {
        let msg = Message::text("t", "carol", "bob", "hi");
        assert_eq!(image_access(&msg, "bob", Some("bob")), ImageAccess::NotImage);
        assert_eq!(ImageAccess::NotImage.label(), None);
    }
}
