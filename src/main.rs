use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    process,
    time::Instant,
};

use clap::Parser;
use log::info;
use passage_lexer::{
    errors::errors::{Error, ErrorTip},
    get_line_at_position, lex_with_options, LexOptions, Mode,
};

#[derive(Parser)]
#[command(name = "passage-lexer")]
#[command(about = "Lexes a story passage and prints its token tree")]
struct Args {
    /// Path to the passage source
    file: PathBuf,

    /// Name recorded on every token (defaults to the file name)
    #[arg(long)]
    place: Option<String>,

    /// Mode the scan starts in: start, macro, string or verbatim
    #[arg(long, default_value = "start")]
    mode: Mode,

    /// Keep fronts and backs as flat sibling tokens
    #[arg(long)]
    no_fold: bool,

    /// Nesting limit for hooks, macros and inner text
    #[arg(long, default_value_t = 128)]
    max_depth: usize,

    /// Print the tree as JSON instead of an outline
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    let contents = match read_to_string(&args.file) {
        Ok(contents) => contents,
        Err(error) => {
            eprintln!("Failed to read {}: {}", args.file.display(), error);
            process::exit(1);
        }
    };

    let place = args.place.clone().unwrap_or_else(|| {
        args.file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string()
    });

    let options = LexOptions::default()
        .place(&place)
        .start_mode(args.mode)
        .fold(!args.no_fold)
        .max_depth(args.max_depth);

    let start = Instant::now();
    let tree = lex_with_options(&contents, &options);
    info!("Tokenized in {:?}", start.elapsed());

    if args.json {
        match serde_json::to_string_pretty(&tree) {
            Ok(json) => println!("{}", json),
            Err(error) => {
                eprintln!("Error formatting tokens: {}", error);
                process::exit(1);
            }
        }
    } else {
        print!("{}", tree);
    }

    let errors = tree.errors();
    for error in &errors {
        display_error(error, &contents, &args.file);
    }

    if !errors.is_empty() {
        process::exit(2);
    }
}

fn display_error(error: &Error, contents: &str, file: &Path) {
    /*
        error: message
        -> cellar.txt
           |
        20 | (set: $a = 1)
           | ---------^
    */

    let position = error.get_position();
    let Some((line, line_text, line_pos)) = get_line_at_position(contents, position.0) else {
        eprintln!("Error: {} at {}", error, position.0);
        return;
    };

    let line_str = line.to_string();
    let padding = line_str.len() + 2;

    if let ErrorTip::None = error.get_tip() {
        eprintln!("Error: {}", error.get_error_name());
    } else {
        eprintln!("Error: {} ({})", error.get_error_name(), error.get_tip());
    }
    eprintln!("-> {}", file.display());
    eprintln!("{:>padding$}", "|");

    let line_text = line_text.trim_end();
    let trimmed = line_text.trim_start();
    let removed_whitespace = line_text.chars().count() - trimmed.chars().count();
    eprintln!("{} | {}", line_str, trimmed);

    let arrows = line_pos.saturating_sub(removed_whitespace) + 1;

    eprintln!("{:>padding$} {:->arrows$}", "|", "^");
}
