//! Facial expression scores and the dominant-expression rule.

use serde::{ser::SerializeMap, Serialize, Serializer};

/// Expression label → probability scores for one detected face.
///
/// Entries keep the order in which they were inserted. That order is significant: it decides
/// which label wins a tie in [`Expressions::dominant`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expressions {
    entries: Vec<(String, f32)>,
}

impl Expressions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the score of `label`.
    ///
    /// If `label` is already present, its score is replaced and it keeps its position.
    pub fn insert<L: Into<String>>(&mut self, label: L, score: f32) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some((_, s)) => *s = score,
            None => self.entries.push((label, score)),
        }
    }

    pub fn get(&self, label: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|&(_, score)| score)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(label, score)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.entries.iter().map(|(l, s)| (l.as_str(), *s))
    }

    /// Returns the label with the highest score, see [`dominant_expression`].
    pub fn dominant(&self) -> &str {
        dominant_expression(self.iter())
    }
}

impl<L: Into<String>> FromIterator<(L, f32)> for Expressions {
    fn from_iter<T: IntoIterator<Item = (L, f32)>>(iter: T) -> Self {
        let mut this = Self::new();
        for (label, score) in iter {
            this.insert(label, score);
        }
        this
    }
}

/// Serializes as a JSON-style object, preserving entry order.
impl Serialize for Expressions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, score) in &self.entries {
            map.serialize_entry(label, score)?;
        }
        map.end()
    }
}

/// Returns the label with the strictly greatest score.
///
/// The first label in iteration order wins ties. Scores are not required to sum to 1. If there
/// are no scores, or none of them is greater than 0, the empty string is returned. `NaN` scores
/// never win.
pub fn dominant_expression<'a, I>(scores: I) -> &'a str
where
    I: IntoIterator<Item = (&'a str, f32)>,
{
    let mut max = 0.0;
    let mut dominant = "";
    for (label, score) in scores {
        if score > max {
            max = score;
            dominant = label;
        }
    }
    dominant
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(entries: &[(&str, f32)]) -> Expressions {
        entries.iter().copied().collect()
    }

    #[test]
    fn picks_highest_score() {
        let e = expr(&[("happy", 0.2), ("neutral", 0.7), ("sad", 0.1)]);
        assert_eq!(e.dominant(), "neutral");
    }

    #[test]
    fn empty_and_nonpositive() {
        assert_eq!(Expressions::new().dominant(), "");
        assert_eq!(expr(&[("happy", 0.0), ("sad", 0.0)]).dominant(), "");
        assert_eq!(expr(&[("happy", -0.5)]).dominant(), "");
        assert_eq!(expr(&[("happy", f32::NAN)]).dominant(), "");
    }

    #[test]
    fn first_label_wins_ties() {
        let e = expr(&[("surprised", 0.4), ("angry", 0.4), ("happy", 0.2)]);
        assert_eq!(e.dominant(), "surprised");

        let e = expr(&[("angry", 0.4), ("surprised", 0.4)]);
        assert_eq!(e.dominant(), "angry");
    }

    #[test]
    fn nan_does_not_reset_maximum() {
        let e = expr(&[("happy", 0.3), ("sad", f32::NAN), ("fearful", 0.1)]);
        assert_eq!(e.dominant(), "happy");
    }

    #[test]
    fn dominant_score_is_maximal() {
        let labels = [
            "neutral",
            "happy",
            "sad",
            "angry",
            "fearful",
            "disgusted",
            "surprised",
        ];
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..500 {
            let len = rng.usize(1..=labels.len());
            let e: Expressions = labels[..len].iter().map(|&l| (l, rng.f32())).collect();

            let dominant = e.dominant();
            if e.iter().all(|(_, s)| s <= 0.0) {
                assert_eq!(dominant, "");
                continue;
            }
            let best = e.get(dominant).unwrap();
            for (label, score) in e.iter() {
                assert!(best >= score, "{dominant}={best} < {label}={score}");
            }
        }
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut e = expr(&[("happy", 0.2), ("sad", 0.5)]);
        e.insert("happy", 0.9);
        assert_eq!(e.len(), 2);
        assert_eq!(e.iter().next(), Some(("happy", 0.9)));
        assert_eq!(e.dominant(), "happy");
    }

    #[test]
    fn serializes_in_order() {
        let e = expr(&[("sad", 0.25), ("happy", 0.75)]);
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"sad":0.25,"happy":0.75}"#);
    }
}
