use std::fmt::Display;

use tracing::debug;

use crate::Error;

pub const FRAME_COUNT: usize = 10;
const ALL_PINS: u32 = 10;

/// One ball of the notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Strike,
    Spare,
    Miss,
    Pins(u8),
}

impl TryFrom<char> for Symbol {
    type Error = char;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'X' => Ok(Symbol::Strike),
            '/' => Ok(Symbol::Spare),
            '-' => Ok(Symbol::Miss),
            // to_digit(10) only yields 0..=9 here.
            c => c.to_digit(10).map(|d| Symbol::Pins(d as u8)).ok_or(c),
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Strike => write!(f, "X"),
            Symbol::Spare => write!(f, "/"),
            Symbol::Miss => write!(f, "-"),
            Symbol::Pins(n) => write!(f, "{}", n),
        }
    }
}

impl Symbol {
    /// Pin count of a ball on its own. A spare has none, its value depends on
    /// the previous ball of the frame.
    pub fn ball_value(self) -> Option<u32> {
        match self {
            Symbol::Strike => Some(ALL_PINS),
            Symbol::Miss => Some(0),
            Symbol::Pins(n) => Some(u32::from(n)),
            Symbol::Spare => None,
        }
    }
}

/// A single game as the flat sequence of balls thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    symbols: Vec<Symbol>,
}

impl TryFrom<&str> for Game {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let symbols = value
            .chars()
            .enumerate()
            .map(|(position, c)| {
                Symbol::try_from(c).map_err(|symbol| Error::InvalidSymbol { symbol, position })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { symbols })
    }
}

impl Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for symbol in &self.symbols {
            write!(f, "{}", symbol)?;
        }

        Ok(())
    }
}

impl Game {
    /// Value of each of the ten frames, bonuses included.
    ///
    /// The cursor only moves past the balls of the current frame, so the balls
    /// after a strike or spare are read again as bonus and then as the start
    /// of the following frame.
    pub fn frame_scores(&self) -> Result<Vec<u32>, Error> {
        let mut scores = Vec::with_capacity(FRAME_COUNT);
        let mut cursor = 0;
        let mut read_end = 0;
        for frame in 1..=FRAME_COUNT {
            let first = self.symbol_at(cursor, frame)?;
            let second = self.symbol_at(cursor + 1, frame)?;
            let score = match (first, second) {
                (Symbol::Strike, _) => {
                    let third = self.symbol_at(cursor + 2, frame)?;
                    read_end = cursor + 3;
                    let score = if third == Symbol::Spare {
                        // The two bonus balls make up a spare.
                        ALL_PINS * 2
                    } else {
                        ALL_PINS + value_at(second, cursor + 1)? + value_at(third, cursor + 2)?
                    };
                    cursor += 1;
                    score
                }
                (Symbol::Spare, _) => return Err(Error::MisplacedSpare { position: cursor }),
                (_, Symbol::Spare) => {
                    let bonus = self.symbol_at(cursor + 2, frame)?;
                    read_end = cursor + 3;
                    let score = ALL_PINS + value_at(bonus, cursor + 2)?;
                    cursor += 2;
                    score
                }
                _ => {
                    read_end = cursor + 2;
                    let score = value_at(first, cursor)? + value_at(second, cursor + 1)?;
                    cursor += 2;
                    score
                }
            };
            scores.push(score);
        }

        if self.symbols.len() > read_end {
            debug!(
                "Ignore {} trailing symbol(s) after the tenth frame of game({}).",
                self.symbols.len() - read_end,
                self
            );
        }

        Ok(scores)
    }

    pub fn score(&self) -> Result<u32, Error> {
        self.frame_scores().map(|scores| scores.iter().sum())
    }

    fn symbol_at(&self, position: usize, frame: usize) -> Result<Symbol, Error> {
        self.symbols
            .get(position)
            .copied()
            .ok_or(Error::MissingBall { frame, position })
    }
}

fn value_at(symbol: Symbol, position: usize) -> Result<u32, Error> {
    symbol
        .ball_value()
        .ok_or(Error::MisplacedSpare { position })
}

/// Total score of one game line.
pub fn score_game(notation: &str) -> Result<u32, Error> {
    Game::try_from(notation)?.score()
}
