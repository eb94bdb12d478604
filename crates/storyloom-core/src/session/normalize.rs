//! Normalization applied to every record before it reaches the store.

use super::model::{Progress, SessionRecord};
use crate::story::{NarrativeTurn, non_blank};
use chrono::{DateTime, Utc};

/// Returns a write-ready copy of `record` stamped with `now`.
///
/// Strings are trimmed, empty non-user turns dropped, turn ids kept strictly
/// increasing from 1, blank choices and answers dropped, blank optional
/// strings collapsed to `None` and progress recomputed from the transcript.
pub fn normalize_record(record: &SessionRecord, now: DateTime<Utc>) -> SessionRecord {
    let mut last_id = 0;
    let turns: Vec<NarrativeTurn> = record
        .turns
        .iter()
        .filter(|turn| turn.is_user_choice() || !turn.content.trim().is_empty())
        .map(|turn| {
            let id = if turn.id > last_id { turn.id } else { last_id + 1 };
            last_id = id;
            NarrativeTurn {
                id,
                content: turn.content.trim().to_string(),
                role: turn.role,
                timestamp: turn.timestamp,
            }
        })
        .collect();

    let progress = Progress {
        total_parts: turns.len(),
        last_choice_index: turns.iter().filter(|t| t.is_user_choice()).count(),
    };

    SessionRecord {
        session_id: record.session_id.trim().to_string(),
        user_id: record.user_id.trim().to_string(),
        story_title: record.story_title.trim().to_string(),
        story_description: record.story_description.trim().to_string(),
        turns,
        pending_choices: record
            .pending_choices
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        story_context: record.story_context.trim().to_string(),
        customization_answers: record
            .customization_answers
            .iter()
            .filter_map(|(index, answer)| {
                let answer = answer.trim();
                (!answer.is_empty()).then(|| (*index, answer.to_string()))
            })
            .collect(),
        customization_questions: record.customization_questions.clone(),
        awaiting_input: record.awaiting_input,
        completed: record.completed,
        scene_image_ref: non_blank(record.scene_image_ref.clone()),
        progress,
        created_at: record.created_at,
        last_updated: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::TurnRole;

    #[test]
    fn test_normalize_record() {
        let mut record = SessionRecord::new(" s-1 ", "u-1", " Title ", "");
        record.push_turn(TurnRole::Narrator, "  Opening  ");
        record.push_turn(TurnRole::UserChoice, "Go left");
        record.push_turn(TurnRole::Narrator, "   ");
        record.turns.push(NarrativeTurn::new(0, TurnRole::Narrator, "Left path"));
        record.pending_choices = vec![" Run ".to_string(), "".to_string()];
        record.customization_answers.insert(0, " Aria ".to_string());
        record.customization_answers.insert(1, "  ".to_string());
        record.scene_image_ref = Some(" ".to_string());

        let now = Utc::now();
        let normalized = normalize_record(&record, now);

        assert_eq!(normalized.session_id, "s-1");
        assert_eq!(normalized.story_title, "Title");
        let ids: Vec<_> = normalized.turns.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(normalized.turns[0].content, "Opening");
        assert_eq!(normalized.turns[2].content, "Left path");
        assert_eq!(normalized.pending_choices, vec!["Run"]);
        assert_eq!(normalized.customization_answers.len(), 1);
        assert_eq!(normalized.customization_answers[&0], "Aria");
        assert_eq!(normalized.scene_image_ref, None);
        assert_eq!(
            normalized.progress,
            Progress {
                total_parts: 3,
                last_choice_index: 1
            }
        );
        assert_eq!(normalized.last_updated, now);
    }

    #[test]
    fn test_normalize_is_stable() {
        let mut record = SessionRecord::new("s-1", "u-1", "Title", "Desc");
        record.push_turn(TurnRole::Narrator, "Opening");
        let now = Utc::now();
        let once = normalize_record(&record, now);
        assert_eq!(normalize_record(&once, now), once);
    }
}
