//! Reconciliation plan
//!
//! Pure part of the renderer: given what the chat shows and what the
//! handler wants shown, decide which messages to edit, delete and send.

use crate::message::{MessageId, MessageKind, RenderedMessage};

/// Edit/delete/send script. Indices point into the desired list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPlan {
    /// `(existing message, desired index)`, in desired order
    pub edits: Vec<(MessageId, usize)>,
    pub deletes: Vec<MessageId>,
    pub sends: Vec<usize>,
}

impl RenderPlan {
    /// Build the plan. With `resend`, nothing is edited.
    ///
    /// Otherwise both lists are walked by position: matching kinds become
    /// edits until the first mismatch or until either list runs out; every
    /// remaining previous message is deleted and every remaining desired
    /// message sent.
    pub fn build(previous: &[RenderedMessage], desired: &[MessageKind], resend: bool) -> Self {
        let matched = if resend {
            0
        } else {
            previous
                .iter()
                .zip(desired)
                .take_while(|(prev, kind)| prev.kind == **kind)
                .count()
        };

        Self {
            edits: previous
                .iter()
                .take(matched)
                .enumerate()
                .map(|(i, prev)| (prev.id, i))
                .collect(),
            deletes: previous.iter().skip(matched).map(|prev| prev.id).collect(),
            sends: (matched..desired.len()).collect(),
        }
    }

    /// Plan used after a failed deletion: send everything fresh
    pub fn send_all(desired_len: usize) -> Self {
        Self {
            edits: Vec::new(),
            deletes: Vec::new(),
            sends: (0..desired_len).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(kinds: &[MessageKind]) -> Vec<RenderedMessage> {
        kinds
            .iter()
            .zip(1..)
            .map(|(&kind, id)| RenderedMessage {
                id: MessageId(id),
                kind,
            })
            .collect()
    }

    use MessageKind::{Photo, Text};

    #[test]
    fn test_same_shape_is_pure_edit() {
        let plan = RenderPlan::build(&shown(&[Text, Photo]), &[Text, Photo], false);
        assert_eq!(plan.edits, vec![(MessageId(1), 0), (MessageId(2), 1)]);
        assert!(plan.deletes.is_empty());
        assert!(plan.sends.is_empty());
    }

    #[test]
    fn test_first_mismatch_ends_editing() {
        let plan = RenderPlan::build(&shown(&[Text, Photo, Text]), &[Text, Text, Text], false);
        assert_eq!(plan.edits, vec![(MessageId(1), 0)]);
        assert_eq!(plan.deletes, vec![MessageId(2), MessageId(3)]);
        assert_eq!(plan.sends, vec![1, 2]);
    }

    #[test]
    fn test_resend_deletes_everything() {
        let plan = RenderPlan::build(&shown(&[Text, Text]), &[Text], true);
        assert!(plan.edits.is_empty());
        assert_eq!(plan.deletes, vec![MessageId(1), MessageId(2)]);
        assert_eq!(plan.sends, vec![0]);
    }

    #[test]
    fn test_nothing_shown_sends_all() {
        let plan = RenderPlan::build(&[], &[Text, Photo], false);
        assert_eq!(plan, RenderPlan::send_all(2));
    }
}
