//! Gap/replacement segment planning over the original track.

use crate::error::ComposeError;
use crate::types::PhraseEdit;

/// One slice of the reconstructed audio timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Untouched source audio from `from` to `to` (open-ended when `None`).
    Original { from: f64, to: Option<f64> },
    /// The adapted clip with this index.
    Replacement { clip_index: usize },
}

/// An edit with its clip's real, post-adaptation duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedEdit {
    pub start: f64,
    pub actual_duration: f64,
}

/// Check a batch of edits before any synthesis work starts.
///
/// Rejects empty labels, negative or non-finite starts, non-positive
/// durations, starts past the end of the track, and requested windows
/// that overlap once sorted by start.
pub fn validate_edits(edits: &[PhraseEdit], total_duration: f64) -> Result<(), ComposeError> {
    for (i, edit) in edits.iter().enumerate() {
        if edit.label.trim().is_empty() {
            return Err(ComposeError::InvalidTimeline(format!(
                "phrase {} has an empty label",
                i
            )));
        }
        if !edit.start.is_finite() || edit.start < 0.0 {
            return Err(ComposeError::InvalidTimeline(format!(
                "phrase {} has invalid start {}",
                i, edit.start
            )));
        }
        if !edit.duration.is_finite() || edit.duration <= 0.0 {
            return Err(ComposeError::InvalidTimeline(format!(
                "phrase {} has invalid duration {}",
                i, edit.duration
            )));
        }
        if edit.start > total_duration {
            return Err(ComposeError::InvalidTimeline(format!(
                "phrase {} starts at {:.3}s, after the end of the track ({:.3}s)",
                i, edit.start, total_duration
            )));
        }
    }

    let mut sorted: Vec<&PhraseEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
    for pair in sorted.windows(2) {
        if pair[0].end() > pair[1].start {
            return Err(ComposeError::InvalidTimeline(format!(
                "phrase \"{}\" [{:.3}s, {:.3}s) overlaps phrase \"{}\" starting at {:.3}s",
                pair[0].label,
                pair[0].start,
                pair[0].end(),
                pair[1].label,
                pair[1].start
            )));
        }
    }
    Ok(())
}

/// Plan the segment sequence for edits sorted ascending by start.
///
/// The cursor advances by each clip's actual duration, so a clip longer
/// than its window pushes the following gap later instead of being cut.
pub fn plan_timeline(
    edits: &[PlacedEdit],
    total_duration: f64,
) -> Result<Vec<Segment>, ComposeError> {
    if edits.is_empty() {
        return Ok(vec![Segment::Original { from: 0.0, to: None }]);
    }

    let mut segments = Vec::with_capacity(edits.len() * 2 + 1);
    let mut cursor = 0.0;
    let mut previous_start = f64::NEG_INFINITY;

    for (i, edit) in edits.iter().enumerate() {
        if edit.start < previous_start {
            return Err(ComposeError::InvalidTimeline(format!(
                "edit {} starts at {:.3}s, before the previous edit at {:.3}s",
                i, edit.start, previous_start
            )));
        }
        previous_start = edit.start;

        if edit.start > cursor {
            segments.push(Segment::Original {
                from: cursor,
                to: Some(edit.start),
            });
        }
        segments.push(Segment::Replacement { clip_index: i });
        cursor = edit.start + edit.actual_duration;
    }

    if cursor < total_duration {
        segments.push(Segment::Original {
            from: cursor,
            to: None,
        });
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AdaptMode;

    fn placed(start: f64, actual_duration: f64) -> PlacedEdit {
        PlacedEdit {
            start,
            actual_duration,
        }
    }

    fn edit(label: &str, start: f64, duration: f64) -> PhraseEdit {
        PhraseEdit {
            label: label.into(),
            start,
            duration,
            mode: AdaptMode::Stretch,
        }
    }

    #[test]
    fn test_plan_no_edits() {
        let plan = plan_timeline(&[], 10.0).unwrap();
        assert_eq!(plan, vec![Segment::Original { from: 0.0, to: None }]);
    }

    #[test]
    fn test_plan_full_span() {
        let plan = plan_timeline(&[placed(0.0, 10.0)], 10.0).unwrap();
        assert_eq!(plan, vec![Segment::Replacement { clip_index: 0 }]);
    }

    #[test]
    fn test_plan_two_edits_with_gap() {
        let plan = plan_timeline(&[placed(2.0, 1.0), placed(5.0, 2.0)], 10.0).unwrap();
        assert_eq!(
            plan,
            vec![
                Segment::Original { from: 0.0, to: Some(2.0) },
                Segment::Replacement { clip_index: 0 },
                Segment::Original { from: 3.0, to: Some(5.0) },
                Segment::Replacement { clip_index: 1 },
                Segment::Original { from: 7.0, to: None },
            ]
        );
    }

    #[test]
    fn test_plan_adjacent_edits_have_no_gap() {
        let plan = plan_timeline(&[placed(1.0, 2.0), placed(3.0, 1.0)], 4.0).unwrap();
        assert_eq!(
            plan,
            vec![
                Segment::Original { from: 0.0, to: Some(1.0) },
                Segment::Replacement { clip_index: 0 },
                Segment::Replacement { clip_index: 1 },
            ]
        );
    }

    #[test]
    fn test_plan_long_clip_pushes_next_gap() {
        // The first clip runs past the second edit's start: no gap is emitted
        // and the second clip follows immediately.
        let plan = plan_timeline(&[placed(0.0, 4.0), placed(3.0, 1.0)], 10.0).unwrap();
        assert_eq!(
            plan,
            vec![
                Segment::Replacement { clip_index: 0 },
                Segment::Replacement { clip_index: 1 },
                Segment::Original { from: 4.0, to: None },
            ]
        );
    }

    #[test]
    fn test_plan_rejects_unsorted() {
        let result = plan_timeline(&[placed(5.0, 1.0), placed(2.0, 1.0)], 10.0);
        assert!(matches!(result, Err(ComposeError::InvalidTimeline(_))));
    }

    #[test]
    fn test_validate_accepts_touching_windows() {
        let edits = vec![edit("b", 3.0, 2.0), edit("a", 1.0, 2.0)];
        assert!(validate_edits(&edits, 10.0).is_ok());
    }

    #[test]
    fn test_validate_rejects_overlap_in_any_order() {
        let edits = vec![edit("late", 4.0, 1.0), edit("early", 2.0, 2.5)];
        let err = validate_edits(&edits, 10.0).unwrap_err();
        assert!(err.to_string().contains("overlaps"), "{}", err);
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        assert!(validate_edits(&[edit("a", -0.1, 1.0)], 10.0).is_err());
        assert!(validate_edits(&[edit("a", 0.0, 0.0)], 10.0).is_err());
        assert!(validate_edits(&[edit("a", f64::NAN, 1.0)], 10.0).is_err());
        assert!(validate_edits(&[edit("a", 1.0, f64::INFINITY)], 10.0).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_label() {
        let err = validate_edits(&[edit("  ", 0.0, 1.0)], 10.0).unwrap_err();
        assert!(err.to_string().contains("empty label"));
    }

    #[test]
    fn test_validate_rejects_start_after_track() {
        assert!(validate_edits(&[edit("a", 11.0, 1.0)], 10.0).is_err());
        assert!(validate_edits(&[edit("a", 10.0, 1.0)], 10.0).is_ok());
    }
}
