//! Reconstruction of missing chapter numbers from their neighbours.
//!
//! Lists run from the most recent chapter (index 0) down to the oldest, so
//! the row "above" an index carries the next number and the row "below"
//! carries the previous one. Known numbers spread outward into unknown runs
//! one slot at a time, like a 1D cellular automaton:
//!
//! ```text
//! -++--++---+-+++--
//! ++++++++-+++++++-
//! +++++++++++++++++
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::chapter_number::ChapterNumber;
use crate::error::{ContradictionCase, InferenceError};

/// What to do when both neighbours are known but predict different numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InferencePolicy {
    /// Assume a gap in the listing and take the lower prediction.
    #[default]
    PreferLower,
    /// Any disagreement is a contradiction.
    Strict,
}

/// Adjacent pair of indexes where the known/unknown state flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchingPoint {
    pub left: usize,
    pub right: usize,
    pub left_state: bool,
    pub right_state: bool,
}

impl SwitchingPoint {
    pub fn new(
        left: usize,
        right: usize,
        left_state: bool,
        right_state: bool,
    ) -> Result<Self, InferenceError> {
        if left.checked_add(1) != Some(right) || left_state == right_state {
            return Err(InferenceError::InvalidSwitchingPoint { left, right });
        }
        Ok(Self {
            left,
            right,
            left_state,
            right_state,
        })
    }
}

/// Every [`SwitchingPoint`] of `items` under `predicate`.
///
/// `111001` has two: `(2, 3)` and `(4, 5)`.
pub fn switching_points<T>(
    items: &[T],
    predicate: impl Fn(&T) -> bool,
) -> Result<Vec<SwitchingPoint>, InferenceError> {
    let mut points = Vec::new();
    let mut states = items.iter().map(predicate).enumerate();
    let Some((_, mut state)) = states.next() else {
        return Ok(points);
    };

    for (index, next) in states {
        if next != state {
            points.push(SwitchingPoint::new(index - 1, index, state, next)?);
            state = next;
        }
    }
    Ok(points)
}

/// Unknown slot with at least one known neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingEdge {
    pub index: usize,
    pub above_known: bool,
    pub below_known: bool,
}

impl MissingEdge {
    pub fn new(index: usize, above_known: bool, below_known: bool) -> Result<Self, InferenceError> {
        if !above_known && !below_known {
            return Err(InferenceError::Contradiction {
                case: ContradictionCase::NoKnownNeighbor,
                index,
            });
        }
        Ok(Self {
            index,
            above_known,
            below_known,
        })
    }
}

/// Fills every `None` in `numbers` from its neighbours.
///
/// A fully known list comes back unchanged; a list without a single known
/// number fails with [`InferenceError::NoAnchor`].
pub fn infer_missing(
    numbers: &[Option<ChapterNumber>],
    policy: InferencePolicy,
) -> Result<Vec<ChapterNumber>, InferenceError> {
    let points = switching_points(numbers, Option::is_some)?;
    if points.is_empty() {
        return numbers
            .iter()
            .copied()
            .collect::<Option<Vec<_>>>()
            .ok_or(InferenceError::NoAnchor { len: numbers.len() });
    }

    let mut queue: VecDeque<MissingEdge> = VecDeque::new();
    for point in points {
        if point.left_state {
            queue.push_back(MissingEdge::new(point.right, true, false)?);
            continue;
        }

        // a single unknown slot between two known ones
        match queue.back_mut() {
            Some(last) if last.index == point.left => last.below_known = true,
            _ => queue.push_back(MissingEdge::new(point.left, false, true)?),
        }
    }

    let mut values = numbers.to_vec();
    while let Some(edge) = queue.pop_front() {
        let index = edge.index;
        let above = || known_at(&values, index.checked_sub(1), index);
        let below = || known_at(&values, index.checked_add(1), index);

        let value = match (edge.above_known, edge.below_known) {
            (true, true) => between(above()?, below()?, index, policy)?,
            (true, false) => {
                let above = above()?;
                above
                    .predict_previous()
                    .ok_or(InferenceError::Underflow { number: above, index })?
            }
            (false, true) => below()?.predict_next().ok_or(InferenceError::Contradiction {
                case: ContradictionCase::PredictionCrossesNeighbor,
                index,
            })?,
            (false, false) => {
                return Err(InferenceError::Contradiction {
                    case: ContradictionCase::NoKnownNeighbor,
                    index,
                });
            }
        };
        values[index] = Some(value);
        tracing::trace!(index, %value, "inferred chapter number");

        if !edge.below_known {
            spread(&mut queue, &values, index.checked_add(1), Direction::Down);
        }
        if !edge.above_known {
            spread(&mut queue, &values, index.checked_sub(1), Direction::Up);
        }
    }

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            value.ok_or(InferenceError::Contradiction {
                case: ContradictionCase::NoKnownNeighbor,
                index,
            })
        })
        .collect()
}

fn known_at(
    values: &[Option<ChapterNumber>],
    neighbor: Option<usize>,
    index: usize,
) -> Result<ChapterNumber, InferenceError> {
    neighbor
        .and_then(|n| values.get(n).copied().flatten())
        .ok_or(InferenceError::Contradiction {
            case: ContradictionCase::NoKnownNeighbor,
            index,
        })
}

fn between(
    above: ChapterNumber,
    below: ChapterNumber,
    index: usize,
    policy: InferencePolicy,
) -> Result<ChapterNumber, InferenceError> {
    let fail = |case| InferenceError::Contradiction { case, index };

    if above == below {
        return Err(fail(ContradictionCase::EqualNeighbors));
    }
    if above < below {
        return Err(fail(ContradictionCase::InvertedNeighbors));
    }

    let by_decreasing = above
        .predict_previous()
        .ok_or(InferenceError::Underflow { number: above, index })?;
    let by_increasing = below
        .predict_next()
        .ok_or(fail(ContradictionCase::PredictionCrossesNeighbor))?;

    if by_decreasing == by_increasing {
        return Ok(by_decreasing);
    }
    if by_increasing >= above || by_decreasing <= below {
        return Err(fail(ContradictionCase::PredictionCrossesNeighbor));
    }
    match policy {
        // gap between the neighbours, stay close to the older chapter
        InferencePolicy::PreferLower if by_decreasing > by_increasing => Ok(by_increasing),
        _ => Err(fail(ContradictionCase::IrreconcilablePredictions)),
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

/// Queues the next unknown slot in `direction`, or upgrades the edge already
/// queued for it to a both-known edge.
fn spread(
    queue: &mut VecDeque<MissingEdge>,
    values: &[Option<ChapterNumber>],
    target: Option<usize>,
    direction: Direction,
) {
    let Some(target) = target.filter(|t| matches!(values.get(*t), Some(None))) else {
        return;
    };

    if let Some(queued) = queue.iter_mut().find(|edge| edge.index == target) {
        match direction {
            Direction::Down => queued.above_known = true,
            Direction::Up => queued.below_known = true,
        }
        return;
    }

    queue.push_back(match direction {
        Direction::Down => MissingEdge {
            index: target,
            above_known: true,
            below_known: false,
        },
        Direction::Up => MissingEdge {
            index: target,
            above_known: false,
            below_known: true,
        },
    });
}
