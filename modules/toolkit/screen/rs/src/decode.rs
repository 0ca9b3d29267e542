use std::fmt::{Display, Formatter};

use eyre::Result;

use varsieve_core_rs::error::Error;
use varsieve_core_rs::DELETION;

/// Allele symbol observed in the base column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Symbol {
    // Uppercased base letter
    Base(u8),
    Deletion,
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Base(base) => write!(f, "{}", *base as char),
            Symbol::Deletion => write!(f, "{DELETION}"),
        }
    }
}

/// Symbol -> number of reads, in the order symbols were first seen.
/// Linear scans are fine: a position has at most six distinct symbols.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Tally {
    entries: Vec<(Symbol, u32)>,
}

impl Tally {
    pub fn add(&mut self, symbol: Symbol) {
        match self.entries.iter_mut().find(|(s, _)| *s == symbol) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((symbol, 1)),
        }
    }

    pub fn remove(&mut self, symbol: Symbol) -> Option<u32> {
        let ind = self.entries.iter().position(|(s, _)| *s == symbol)?;
        Some(self.entries.remove(ind).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, u32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| *count as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Classification of a single character in the `Ready` state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Step {
    Match,
    Substitution(u8),
    DeletionMarker,
    IndelPrefix,
    ReadStart,
    ReadEnd,
    ReferenceSkip,
    Unknown,
}

impl Step {
    fn classify(character: u8) -> Self {
        match character {
            b'.' | b',' => Step::Match,
            b'A' | b'C' | b'G' | b'T' | b'N' | b'a' | b'c' | b'g' | b't' | b'n' => {
                Step::Substitution(character.to_ascii_uppercase())
            }
            b'*' | b'#' => Step::DeletionMarker,
            b'+' | b'-' => Step::IndelPrefix,
            b'^' => Step::ReadStart,
            b'$' => Step::ReadEnd,
            // Reference skip of a spliced read (CIGAR N)
            b'>' | b'<' => Step::ReferenceSkip,
            _ => Step::Unknown,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Ready,
    // Reading the decimal length of an inserted/deleted sequence
    IndelLength { length: usize, digits: usize },
    // Skipping the inserted/deleted sequence itself
    IndelPayload { remaining: usize },
    // `^` is always followed by a single mapping quality character
    MappingQuality,
}

/// Decode the base column of a pileup line into a tally, reusing the provided buffer.
/// The reference allele is removed from the tally once the whole string is consumed.
pub fn decode_into(bases: &str, reference: u8, tally: &mut Tally) -> Result<()> {
    tally.clear();
    let reference = reference.to_ascii_uppercase();
    let malformed = |offset: usize, reason: &str| -> eyre::Report {
        Error::malformed_pileup(format!("{reason} at offset {offset} of '{bases}'")).into()
    };

    let bytes = bases.as_bytes();
    let mut state = State::Ready;
    let mut offset = 0;
    while offset < bytes.len() {
        let character = bytes[offset];
        let current = state;
        state = match current {
            State::Ready => {
                match Step::classify(character) {
                    Step::Match => tally.add(Symbol::Base(reference)),
                    Step::Substitution(base) => tally.add(Symbol::Base(base)),
                    Step::DeletionMarker => tally.add(Symbol::Deletion),
                    Step::IndelPrefix => {
                        offset += 1;
                        state = State::IndelLength {
                            length: 0,
                            digits: 0,
                        };
                        continue;
                    }
                    Step::ReadStart => {
                        offset += 1;
                        state = State::MappingQuality;
                        continue;
                    }
                    Step::ReadEnd | Step::ReferenceSkip => {}
                    Step::Unknown => {
                        return Err(malformed(
                            offset,
                            &format!("unknown character '{}'", character as char),
                        ))
                    }
                }
                State::Ready
            }
            State::IndelLength { length, digits } if character.is_ascii_digit() => {
                let length = length
                    .checked_mul(10)
                    .and_then(|x| x.checked_add((character - b'0') as usize))
                    .ok_or_else(|| malformed(offset, "indel length overflow"))?;
                State::IndelLength {
                    length,
                    digits: digits + 1,
                }
            }
            State::IndelLength { digits: 0, .. } => {
                return Err(malformed(offset, "indel without a length"));
            }
            State::IndelLength { length, .. } => {
                // The current character is not consumed: it's either the first payload
                // character or, for a zero-length indel, the next read
                state = if length == 0 {
                    State::Ready
                } else {
                    State::IndelPayload { remaining: length }
                };
                continue;
            }
            State::IndelPayload { remaining: 1 } => State::Ready,
            State::IndelPayload { remaining } => State::IndelPayload {
                remaining: remaining - 1,
            },
            State::MappingQuality => State::Ready,
        };
        offset += 1;
    }

    match state {
        State::Ready | State::IndelLength { length: 0, digits: 1.. } => {}
        State::IndelLength { digits: 0, .. } => {
            return Err(malformed(offset, "indel without a length"));
        }
        State::IndelLength { length, .. } | State::IndelPayload { remaining: length } => {
            return Err(malformed(
                offset,
                &format!("truncated indel, {length} characters are missing"),
            ));
        }
        State::MappingQuality => {
            return Err(malformed(offset, "read start without a mapping quality"));
        }
    }

    tally.remove(Symbol::Base(reference));
    Ok(())
}

/// Decode the base column of a pileup line. See [`decode_into`].
pub fn decode(bases: &str, reference: u8) -> Result<Tally> {
    let mut tally = Tally::default();
    decode_into(bases, reference, &mut tally)?;
    Ok(tally)
}
