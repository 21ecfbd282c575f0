use clap::{
    builder::styling::{AnsiColor, Style as AnsiStyle},
    Args, Parser, Subcommand,
};
use std::{io::Write, path::PathBuf};

use crate::{
    batch::{Batch, FileFonts},
    episode::{self, EpisodeMatch, MatchStatus},
    files::{list_subtitle_files, Limits},
};

/// The font `style font reset` uses when none is given.
pub const DEFAULT_STYLE_FONT: &str = "Microsoft YaHei";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Subcommands,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// The directory with the subtitle files.
    ///
    /// Only files directly inside it are considered.
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,
    /// The largest subtitle file, in bytes, that will be read.
    ///
    /// Defaults to the SUBS_MAX_SUBTITLE_FILE_BYTES environment
    /// variable or 50 MiB if that isn't set.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..), verbatim_doc_comment)]
    pub max_file_bytes: Option<u64>,
    /// Log what is being done to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn limits(&self) -> Limits {
        self.max_file_bytes
            .map(Limits::new)
            .unwrap_or_else(Limits::from_env)
    }
}

#[derive(Subcommand, Debug)]
pub enum Subcommands {
    /// Lists the .srt and .ass files
    List,
    /// Subtitle file encoding operations
    #[command(subcommand)]
    Encoding(EncodingCommand),
    /// Dialogue operations (.ass only)
    #[command(subcommand)]
    Dialogue(DialogueCommand),
    /// Style operations (.ass only)
    #[command(subcommand)]
    Style(StyleCommand),
    /// Matches subtitle files with their videos
    #[command(subcommand)]
    File(FileCommand),
}

#[derive(Subcommand, Debug)]
pub enum EncodingCommand {
    /// Shows the detected encoding of every subtitle file
    List,
    /// Converts every subtitle file to UTF-8
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum DialogueCommand {
    /// Fonts set by `\fn` override tags
    #[command(subcommand)]
    Font(DialogueFontCommand),
}

#[derive(Subcommand, Debug)]
pub enum DialogueFontCommand {
    /// Lists the fonts used by `\fn` tags in every .ass file
    List,
    /// Removes every `\fn` tag from every .ass file.
    ///
    /// Only the tag itself is removed, e.g. `{\fnArial\fs18}` becomes `{\fs18}`.
    Prune,
}

#[derive(Subcommand, Debug)]
pub enum StyleCommand {
    /// Fonts declared in the [V4+ Styles] section
    #[command(subcommand)]
    Font(StyleFontCommand),
}

#[derive(Subcommand, Debug)]
pub enum StyleFontCommand {
    /// Lists the fonts declared in [V4+ Styles] in every .ass file
    List,
    /// Sets the font of every style in every .ass file
    Reset(StyleFontResetArgs),
}

#[derive(Args, Debug)]
pub struct StyleFontResetArgs {
    /// The font to use
    #[arg(long, default_value = DEFAULT_STYLE_FONT)]
    pub font: String,
}

#[derive(Subcommand, Debug)]
pub enum FileCommand {
    /// Shows which video each subtitle file belongs to.
    ///
    /// Subtitles and videos are matched by their SxxEyy episode tag.
    Search,
    /// Renames subtitle files after the video they belong to
    Rename,
}

/// Colours `text` if colouring is enabled.
fn paint(text: &str, colour: AnsiColor, enabled: bool) -> String {
    if enabled {
        let style = AnsiStyle::new().fg_color(Some(colour.into()));
        format!("{style}{text}{style:#}")
    } else {
        text.to_owned()
    }
}

fn print_fonts<W: Write>(out: &mut W, entries: &[FileFonts]) -> anyhow::Result<()> {
    for entry in entries {
        let fonts = if entry.fonts.is_empty() {
            String::from("None")
        } else {
            entry.fonts.join(",")
        };
        writeln!(out, "{}: {fonts}", entry.file_name)?;
    }
    Ok(())
}

fn print_matches<W: Write>(out: &mut W, matches: &[EpisodeMatch], colour: bool) -> anyhow::Result<()> {
    for EpisodeMatch { subtitle, status } in matches {
        match status {
            MatchStatus::Ignored => {
                writeln!(out, "{subtitle} => {}", paint("ignore", AnsiColor::Red, colour))?
            }
            MatchStatus::NotFound => {
                writeln!(out, "{subtitle} => {}", paint("not found", AnsiColor::Red, colour))?
            }
            MatchStatus::Same(video) => writeln!(
                out,
                "{subtitle} => {video} {}",
                paint("(same)", AnsiColor::Green, colour)
            )?,
            MatchStatus::Found(video) => writeln!(out, "{subtitle} => {video} (found)")?,
            MatchStatus::Renamed(name) => writeln!(out, "{subtitle} => {name} (renamed)")?,
        }
    }
    Ok(())
}

impl Cli {
    /// Runs the requested command, printing its report to `out`.
    ///
    /// `colour` controls whether status words are coloured.
    pub fn run<W: Write>(self, out: &mut W, colour: bool) -> anyhow::Result<()> {
        let dir = self.global.dir.clone();
        let batch = Batch::new(&dir, self.global.limits());
        match self.command {
            Subcommands::List => {
                for file in list_subtitle_files(&dir)? {
                    writeln!(out, "{file}")?;
                }
            }
            Subcommands::Encoding(EncodingCommand::List) => {
                for entry in batch.list_encodings()? {
                    writeln!(out, "{} - {}", entry.file_name, entry.encoding)?;
                }
            }
            Subcommands::Encoding(EncodingCommand::Reset) => {
                let summary = batch.reset_encodings()?;
                writeln!(
                    out,
                    "Total {} file(s), updated {} file(s)",
                    summary.total, summary.updated
                )?;
            }
            Subcommands::Dialogue(DialogueCommand::Font(DialogueFontCommand::List)) => {
                print_fonts(out, &batch.list_dialogue_fonts()?)?;
            }
            Subcommands::Dialogue(DialogueCommand::Font(DialogueFontCommand::Prune)) => {
                let summary = batch.prune_dialogue_fonts()?;
                writeln!(
                    out,
                    "Pruned {} font tags in {} files.",
                    summary.removed_tags, summary.total_files
                )?;
            }
            Subcommands::Style(StyleCommand::Font(StyleFontCommand::List)) => {
                print_fonts(out, &batch.list_style_fonts()?)?;
            }
            Subcommands::Style(StyleCommand::Font(StyleFontCommand::Reset(args))) => {
                let summary = batch.reset_style_fonts(&args.font)?;
                writeln!(
                    out,
                    "Reset {} font names in {} file(s).",
                    summary.updated_fonts, summary.updated_files
                )?;
            }
            Subcommands::File(FileCommand::Search) => {
                print_matches(out, &episode::match_subtitles(&dir)?, colour)?;
            }
            Subcommands::File(FileCommand::Rename) => {
                print_matches(out, &episode::rename_subtitles(&dir)?, colour)?;
            }
        }
        Ok(())
    }
}
