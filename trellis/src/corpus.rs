//! Reader for tagged training corpora.

use std::io::{BufRead, BufReader, Read};

use crate::errors::{Result, TrellisError};
use crate::sequence::TaggedSequence;

/// A collection of tagged sentences loaded from a corpus file.
///
/// The format is one `word TAB tag` pair per line, with a line consisting of
/// `EOS` terminating each sentence:
///
/// ```text
/// the DET
/// dog NOUN
/// barks VERB
/// EOS
/// ```
pub struct Corpus {
    sequences: Vec<TaggedSequence<String, String>>,
}

impl Corpus {
    /// Loads a corpus from the given sink.
    ///
    /// Sentences are assigned ordinal ids. Empty sentences are skipped.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A reader of the corpus.
    ///
    /// # Errors
    ///
    /// [`TrellisError`] is returned when an input format is invalid.
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let buf = BufReader::new(rdr);

        let mut sequences = vec![];
        let mut words = vec![];
        let mut labels = vec![];
        for line in buf.lines() {
            let line = line?;
            let mut spl = line.split('\t');
            let surface = spl.next();
            let tag = spl.next();
            let rest = spl.next();
            match (surface, tag, rest) {
                (Some(surface), Some(tag), None) => {
                    words.push(surface.to_string());
                    labels.push(tag.to_string());
                }
                (Some("EOS"), None, None) => {
                    if !words.is_empty() {
                        let id = format!("{}", sequences.len());
                        sequences.push(TaggedSequence::new(
                            std::mem::take(&mut labels),
                            std::mem::take(&mut words),
                            id,
                        )?);
                    }
                }
                _ => {
                    return Err(TrellisError::invalid_format(
                        "rdr",
                        "Each line must be a pair of a word and a tag or `EOS`",
                    ))
                }
            }
        }

        Ok(Self { sequences })
    }

    /// Returns the loaded sentences.
    #[inline(always)]
    pub fn sequences(&self) -> &[TaggedSequence<String, String>] {
        &self.sequences
    }

    /// Consumes the corpus, returning the loaded sentences.
    pub fn into_sequences(self) -> Vec<TaggedSequence<String, String>> {
        self.sequences
    }
}
