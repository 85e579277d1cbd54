use std::{
    fs::File,
    io::{self, stderr, stdout, BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod game;

pub use game::{score_game, Game, Symbol};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Score file({}) does not exist.", .0.display())]
    FileNotFound(PathBuf),
    #[error("Cannot read score file({}).", .path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid symbol({symbol}) at position {position}, expect 'X', '/', '-' or a digit.")]
    InvalidSymbol { symbol: char, position: usize },
    #[error("Frame {frame} needs a ball at position {position}, but the notation ends before it.")]
    MissingBall { frame: usize, position: usize },
    #[error("Line isn't valid UTF-8 after byte {offset}.")]
    InvalidEncoding { offset: usize },
    #[error("Spare at position {position} doesn't follow the first ball of a frame.")]
    MisplacedSpare { position: usize },
}

impl Error {
    pub fn is_malformed_notation(&self) -> bool {
        matches!(
            self,
            Error::InvalidSymbol { .. }
                | Error::MissingBall { .. }
                | Error::MisplacedSpare { .. }
                | Error::InvalidEncoding { .. }
        )
    }
}

#[derive(Debug, Parser)]
#[command(version, about = "Score ten-pin bowling games written in ball-by-ball notation.")]
pub struct CLIArgs {
    /// File with one game per line.
    pub input_path: Option<PathBuf>,
}

/// One raw line of a score file, numbered from 1.
#[derive(Debug)]
pub struct GameLine {
    pub line: usize,
    bytes: Vec<u8>,
}

impl GameLine {
    /// Trimmed notation, or the offset of the first byte that isn't UTF-8.
    pub fn notation(&self) -> std::result::Result<&str, Error> {
        std::str::from_utf8(&self.bytes)
            .map(str::trim)
            .map_err(|e| Error::InvalidEncoding {
                offset: e.valid_up_to(),
            })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).trim().to_string()
    }
}

pub struct GameLines<R = BufReader<File>> {
    path: PathBuf,
    reader: R,
    line: usize,
    failed: bool,
}

impl<R: BufRead> GameLines<R> {
    fn new(path: PathBuf, reader: R) -> Self {
        Self {
            path,
            reader,
            line: 0,
            failed: false,
        }
    }
}

impl<R: BufRead> Iterator for GameLines<R> {
    type Item = Result<GameLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut bytes = Vec::new();
        let read = self.reader.read_until(b'\n', &mut bytes);
        if let Ok(0) = read {
            return None;
        }

        self.line += 1;
        let line = self.line;
        match read {
            Ok(_) => Some(Ok(GameLine { line, bytes })),
            Err(e) => {
                self.failed = true;
                Some(Err::<GameLine, _>(e).with_context(|| {
                    format!(
                        "Failed to read line {} of given file({}).",
                        line,
                        self.path.display()
                    )
                }))
            }
        }
    }
}

pub fn read_games<P: AsRef<Path>>(path: P) -> std::result::Result<GameLines, Error> {
    let path = path.as_ref();
    if path.is_dir() {
        return Err(Error::FileUnreadable {
            path: path.to_path_buf(),
            source: io::Error::other("path is a directory"),
        });
    }

    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
        _ => Error::FileUnreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    Ok(GameLines::new(path.to_path_buf(), BufReader::new(file)))
}

#[derive(Debug)]
pub struct GameResult {
    pub line: usize,
    pub notation: String,
    pub score: std::result::Result<u32, Error>,
}

/// Score every game in the given file, in line order.
///
/// Errors of the file itself abort the whole run. A malformed game only
/// fails its own entry.
pub fn score_file<P: AsRef<Path>>(path: P) -> Result<Vec<GameResult>> {
    let results = score_games(read_games(&path)?)?;
    info!(
        "Scored {} game(s) from file({}).",
        results.len(),
        path.as_ref().display()
    );

    Ok(results)
}

fn score_games<R: BufRead>(games: GameLines<R>) -> Result<Vec<GameResult>> {
    games
        .map(|game| {
            game.map(|game| {
                let score = game.notation().and_then(score_game);
                let notation = game.text();
                match &score {
                    Ok(s) => debug!("Line {} game({}) scored {}.", game.line, notation, s),
                    Err(e) => warn!(
                        "Line {} game({}) is malformed: {}.",
                        game.line, notation, e
                    ),
                }

                GameResult {
                    line: game.line,
                    notation,
                    score,
                }
            })
        })
        .collect()
}

pub fn write_scores<W: Write, E: Write>(
    out: &mut W,
    err: &mut E,
    results: &[GameResult],
) -> io::Result<()> {
    for (ind, result) in results.iter().enumerate() {
        match &result.score {
            Ok(score) => writeln!(out, "Game: {}  score: {}", ind + 1, score)?,
            Err(e) => writeln!(
                err,
                "Game: {}  error: {} (line {}: \"{}\")",
                ind + 1,
                e,
                result.line,
                result.notation
            )?,
        }
    }

    Ok(())
}

pub fn print_scores(results: &[GameResult]) -> io::Result<()> {
    write_scores(&mut stdout().lock(), &mut stderr().lock(), results)
}

#[cfg(test)]
mod tests {
    use std::io::{Chain, Cursor, Read};

    use super::*;
    use tempfile::NamedTempFile;

    fn write_games(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_single_game_file() {
        let file = write_games(&["XXXXXXXXXXXX"]);
        let results = score_file(file.path()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].line, 1);
        assert_eq!(results[0].score.as_ref().unwrap(), &300);
    }

    #[test]
    fn test_file_keeps_line_order() {
        let file = write_games(&[
            "  9-9-9-9-9-9-9-9-9-9-  ",
            "XXXXXXXXXXXX",
            "--------------------",
            "5/5/5/5/5/5/5/5/5/5/5",
        ]);
        let scores = score_file(file.path())
            .unwrap()
            .into_iter()
            .map(|r| r.score.unwrap())
            .collect::<Vec<_>>();
        assert_eq!(scores, vec![90, 300, 0, 150]);
    }

    #[test]
    fn test_malformed_line_does_not_stop_batch() {
        let file = write_games(&["XXXXXXXXXX", "XXXXXXXXXXXX"]);
        let results = score_file(file.path()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0]
            .score
            .as_ref()
            .is_err_and(|e| e.is_malformed_notation()));
        assert_eq!(results[0].notation, "XXXXXXXXXX");
        assert_eq!(results[1].score.as_ref().unwrap(), &300);
    }

    #[test]
    fn test_invalid_utf8_line_fails_only_its_game() {
        let mut file = NamedTempFile::new().unwrap();
        let bytes = b"XXXXXXXXXXXX\n9-9-\xff9-9-9-9-9-9-9-9-\n--------------------\n";
        file.write_all(bytes).unwrap();
        let results = score_file(file.path()).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].score.as_ref().unwrap(), &300);
        assert!(matches!(results[1].score, Err(Error::InvalidEncoding { offset: 4 })));
        assert_eq!(results[1].line, 2);
        assert!(results[1].notation.starts_with("9-9-\u{FFFD}9-"));
        assert_eq!(results[2].score.as_ref().unwrap(), &0);
    }

    #[test]
    fn test_non_ascii_symbol_is_malformed() {
        let file = write_games(&["9-9-\u{e9}9-9-9-9-9-9-9-9-", "9-9-9-9-9-9-9-9-9-9-"]);
        let results = score_file(file.path()).unwrap();
        assert!(matches!(
            results[0].score,
            Err(Error::InvalidSymbol {
                symbol: '\u{e9}',
                position: 4
            })
        ));
        assert_eq!(results[1].score.as_ref().unwrap(), &90);
    }

    struct BrokenDisk;

    impl Read for BrokenDisk {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk gone"))
        }
    }

    fn broken_games() -> GameLines<BufReader<Chain<Cursor<Vec<u8>>, BrokenDisk>>> {
        let reader = Cursor::new(b"XXXXXXXXXXXX\n".to_vec()).chain(BrokenDisk);
        GameLines::new(PathBuf::from("games.txt"), BufReader::new(reader))
    }

    #[test]
    fn test_read_error_names_line_and_file() {
        let mut games = broken_games();
        let first = games.next().unwrap().unwrap();
        assert_eq!(first.line, 1);
        assert_eq!(first.notation().unwrap(), "XXXXXXXXXXXX");

        let err = games.next().unwrap().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to read line 2 of given file(games.txt)."
        );
        assert!(format!("{:#}", err).contains("disk gone"));
        assert!(games.next().is_none());
    }

    #[test]
    fn test_read_error_stops_batch() {
        let err = score_games(broken_games()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to read line 2 of given file(games.txt)."
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        assert!(matches!(read_games(&path), Err(Error::FileNotFound(_))));

        let err = score_file(&path).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::FileNotFound(_))));
    }

    #[test]
    fn test_directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_games(dir.path()), Err(Error::FileUnreadable { .. })));
    }

    #[test]
    fn test_write_scores() {
        let file = write_games(&["XXXXXXXXXXXX", "9-9-9-9-9-9-9-9-9-", "X7/9-X-88/-6XXX81"]);
        let results = score_file(file.path()).unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        write_scores(&mut out, &mut err, &results).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Game: 1  score: 300\nGame: 3  score: 167\n"
        );
        let err = String::from_utf8(err).unwrap();
        assert!(err.starts_with("Game: 2  error: Frame 10"));
        assert!(err.contains("9-9-9-9-9-9-9-9-9-"));
    }
}
