#![forbid(unsafe_code)]

//! Word segmentation and grapheme reveal units.
//!
//! A sentence is split on whitespace into words once, up front. Punctuation
//! stays attached to the word it touches, runs of whitespace collapse, and
//! every word records the byte offsets of its grapheme cluster boundaries so
//! revealing the next character during playback is a slice, not a rescan.
//!
//! # Invariants
//!
//! 1. `segment("")` and whitespace-only input yield an empty vector.
//! 2. No returned word is empty or contains whitespace.
//! 3. `segment(&segment(s).join(" ")) == segment(s)`.
//! 4. A [`Scene`]'s text is its words joined by single spaces.

use smallvec::SmallVec;
use unicode_segmentation::UnicodeSegmentation;

/// Split `text` into whitespace-separated words.
#[must_use]
pub fn segment(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Segment each text independently, preserving order. No deduplication.
#[must_use]
pub fn bulk_segment<I, S>(texts: I) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts.into_iter().map(|t| segment(t.as_ref())).collect()
}

/// Extended grapheme clusters of `text`, owned.
#[must_use]
pub fn split_graphemes(text: &str) -> Vec<String> {
    text.graphemes(true).map(str::to_string).collect()
}

/// Remove the last grapheme cluster of `text`, returning it.
pub fn pop_grapheme(text: &mut String) -> Option<String> {
    let (start, _) = text.grapheme_indices(true).next_back()?;
    Some(text.split_off(start))
}

/// A word with precomputed grapheme boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    text: String,
    /// Byte offset just past each grapheme cluster.
    ends: SmallVec<[usize; 16]>,
}

impl Word {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let ends = text
            .grapheme_indices(true)
            .map(|(start, g)| start + g.len())
            .collect();
        Self { text, ends }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of grapheme clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// The `index`-th grapheme cluster.
    #[must_use]
    pub fn grapheme(&self, index: usize) -> Option<&str> {
        let end = *self.ends.get(index)?;
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        Some(&self.text[start..end])
    }
}

/// One sentence, ready to be typed word by word.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scene {
    words: Vec<Word>,
}

impl Scene {
    /// Segment `text` into a scene.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::from_words(segment(text))
    }

    #[must_use]
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words
                .into_iter()
                .map(Word::new)
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    #[must_use]
    pub fn word(&self, index: usize) -> Option<&Word> {
        self.words.get(index)
    }

    /// Fully rendered text: words joined by single spaces.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(word.as_str());
        }
        out
    }

    /// A scene with no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Ordered, value-deduplicated scenes for one target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SentenceSet {
    scenes: Vec<Scene>,
}

impl SentenceSet {
    /// Segment every sentence, keeping the first occurrence of each scene.
    #[must_use]
    pub fn from_sentences<I, S>(sentences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for sentence in sentences {
            set.push(Scene::from_text(sentence.as_ref()));
        }
        set
    }

    /// Append a scene unless an equal one is already present.
    /// Returns whether it was added.
    pub fn push(&mut self, scene: Scene) -> bool {
        if self.scenes.contains(&scene) {
            return false;
        }
        self.scenes.push(scene);
        true
    }

    #[must_use]
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Index following `index` in rotation, wrapping after the last scene.
    #[must_use]
    pub fn next_index(&self, index: usize) -> usize {
        if self.scenes.is_empty() {
            0
        } else {
            (index + 1) % self.scenes.len()
        }
    }
}
