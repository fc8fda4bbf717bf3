use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser as ClapParser;
use encoding_rs::Encoding;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use subcorrect::config::Config;
use subcorrect::error::SubcorrectError;
use subcorrect::messages::{keys, Messages};
use subcorrect::parser;
use subcorrect::processor::CorrectionSession;
use subcorrect::prompt::{choose, ConsolePrompt, SessionParameters, UserPrompt};
use subcorrect::serialiser;
use subcorrect::strategy::{DictionaryStrategy, PatternStrategy, Strategy};

const DEFAULT_CONFIG: &str = "subcorrect.toml";

fn main() {
    match run() {
        Ok(()) => (),
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            std::process::exit(1);
        }
    }
}

#[derive(ClapParser)]
#[command(version, about = "Interactively correct OCR and spelling errors in SRT subtitles")]
struct Cli {
    #[arg(value_name = "FILE", required = true, help = "The subtitle files to correct.")]
    inputs: Vec<PathBuf>,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "The file to write to. Only valid with a single input file. \
                If not supplied, the result is written next to the input as <name>.corrected.srt."
    )]
    output: Option<PathBuf>,
    #[arg(
        short = 'f',
        long,
        help = "Replace existing files. Without --output, the input file itself is overwritten."
    )]
    overwrite: bool,
    #[arg(
        short,
        long,
        value_name = "LABEL",
        help = "Character encoding of the subtitle files (default: utf-8)."
    )]
    encoding: Option<String>,
    #[arg(
        short,
        long,
        value_name = "NAME",
        help = "The correction strategy to use: 'dictionary' or 'patterns'. Asked for when omitted."
    )]
    strategy: Option<String>,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file. Defaults to ./subcorrect.toml when present."
    )]
    config: Option<PathBuf>,
    #[arg(short, long, help = "Log debugging output to standard error.")]
    verbose: bool,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    if cli.output.is_some() && cli.inputs.len() > 1 {
        bail!("--output can only be used with a single input file");
    }

    let config = load_config(cli.config.as_deref())?;
    let overwrite = cli.overwrite || config.overwrite;
    let encoding = parser::encoding_for_label(cli.encoding.as_deref().unwrap_or(&config.encoding))?;
    let messages = match &config.messages {
        Some(path) => Messages::load(path)?,
        None => Messages::builtin(),
    };
    let strategies = build_strategies(&config)?;

    let mut prompt = ConsolePrompt::new(io::stdin(), io::stdout(), messages);
    let parameters = SessionParameters {
        strategy: cli.strategy.clone(),
        files: cli.inputs.clone(),
    };
    let mut session = CorrectionSession::start(&mut prompt, &parameters)?;

    let strategy = match select_strategy(session.prompt(), &strategies, cli.strategy.as_deref())? {
        Some(strategy) => strategy,
        None => {
            session.prompt().information(keys::NO_STRATEGY, &[])?;
            session.finish()?;
            return Ok(());
        }
    };
    info!("Correcting {} file(s) with the {} strategy", cli.inputs.len(), strategy.name());

    for input in &cli.inputs {
        let target = target_path(input, cli.output.as_deref(), overwrite);
        correct_one(&mut session, strategy, input, &target, encoding, overwrite)?;
    }

    let stats = session.finish()?;
    prompt.information(
        keys::SUMMARY,
        &[&stats.candidates, &stats.replaced, &stats.kept, &stats.from_cache],
    )?;
    Ok(())
}

/// Corrects `input` into `target`. Problems with either file are reported
/// to the user and the file is skipped; only prompt failures are returned.
fn correct_one<P: UserPrompt + ?Sized>(
    session: &mut CorrectionSession<'_, P>,
    strategy: &dyn Strategy,
    input: &Path,
    target: &Path,
    encoding: &'static Encoding,
    overwrite: bool,
) -> Result<()> {
    // Checked up front so no answers are asked for a file that cannot be written.
    if !overwrite && target.exists() {
        warn!("Skipping '{}': '{}' already exists", input.display(), target.display());
        let err = SubcorrectError::TargetExists(target.to_path_buf());
        session
            .prompt()
            .error(keys::WRITE_FAILED, &[&target.display(), &err])?;
        return Ok(());
    }

    let mut file = match parser::read_file(input, encoding) {
        Ok(file) => file,
        Err(err) => {
            warn!("Skipping '{}': {}", input.display(), err);
            session
                .prompt()
                .error(keys::READ_FAILED, &[&input.display(), &err])?;
            return Ok(());
        }
    };

    let invalid = file.invalid_positions();
    if !invalid.is_empty() {
        session
            .prompt()
            .warning(keys::INVALID_SUBTITLES, &[&invalid.len(), &input.display()])?;
    }

    let replaced = session.correct_file(&mut file, strategy)?;

    let unencodable = serialiser::unencodable_positions(&file);
    if !unencodable.is_empty() {
        session.prompt().warning(
            keys::UNENCODABLE,
            &[&unencodable.len(), &file.encoding().name(), &target.display()],
        )?;
    }

    match serialiser::serialise(&file, target, overwrite) {
        Ok(()) => session.prompt().information(
            keys::FILE_DONE,
            &[&input.display(), &replaced, &target.display()],
        )?,
        Err(err) => session
            .prompt()
            .error(keys::WRITE_FAILED, &[&target.display(), &err])?,
    }
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration '{}'", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            info!("Found {} in current directory, loading...", DEFAULT_CONFIG);
            Config::from_file(DEFAULT_CONFIG)
                .with_context(|| format!("Failed to load configuration '{}'", DEFAULT_CONFIG))?
        }
        None => Config::default(),
    };
    Ok(config)
}

fn build_strategies(config: &Config) -> Result<Vec<Box<dyn Strategy>>> {
    let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();

    let dictionary = DictionaryStrategy::new(config.dictionary.clone())?;
    if !dictionary.is_empty() {
        strategies.push(Box::new(dictionary));
    }
    let patterns = PatternStrategy::new(&config.patterns).context("Invalid pattern rule")?;
    if !patterns.is_empty() {
        strategies.push(Box::new(patterns));
    }

    if strategies.is_empty() {
        bail!(
            "No correction rules are configured. Add a [dictionary] table or \
             [[patterns]] entries to {} or the file given with --config.",
            DEFAULT_CONFIG
        );
    }
    Ok(strategies)
}

fn select_strategy<'s, P: UserPrompt + ?Sized>(
    prompt: &mut P,
    strategies: &'s [Box<dyn Strategy>],
    requested: Option<&str>,
) -> Result<Option<&'s dyn Strategy>> {
    let by_name = |name: &str| {
        strategies
            .iter()
            .find(|s| s.name() == name)
            .map(|s| &**s)
    };

    if let Some(name) = requested {
        return by_name(name)
            .map(Some)
            .ok_or_else(|| anyhow!("Strategy '{}' is unknown or has no rules configured", name));
    }
    if strategies.len() == 1 {
        return Ok(Some(&*strategies[0]));
    }

    let names: Vec<&str> = strategies.iter().map(|s| s.name()).collect();
    let chosen = choose(prompt, &names, keys::CHOOSE_STRATEGY, &[])?;
    Ok(chosen.and_then(|name| by_name(*name)))
}

/// Where the corrected version of `input` goes.
fn target_path(input: &Path, output: Option<&Path>, overwrite: bool) -> PathBuf {
    if let Some(output) = output {
        return output.to_path_buf();
    }
    if overwrite {
        return input.to_path_buf();
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subtitles".to_string());
    input.with_file_name(format!("{}.corrected.srt", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use subcorrect::prompt::scripted::Level;
    use subcorrect::prompt::{ScriptedPrompt, UserDecision};

    const MOVIE: &str = "1\n00:00:01,000 --> 00:00:02,000\nl know ther is more\n";

    fn config() -> Config {
        let mut config = Config::default();
        config
            .dictionary
            .insert("ther".to_string(), "there".to_string());
        config.patterns.push(subcorrect::config::PatternRule {
            pattern: r"\bl\b".to_string(),
            replacement: "I".to_string(),
        });
        config
    }

    #[test]
    fn target_defaults_next_to_input() {
        let input = Path::new("dir/movie.en.srt");
        assert_eq!(
            target_path(input, None, false),
            PathBuf::from("dir/movie.en.corrected.srt")
        );
        assert_eq!(target_path(input, None, true), input.to_path_buf());
        assert_eq!(
            target_path(input, Some(Path::new("out.srt")), false),
            PathBuf::from("out.srt")
        );
    }

    #[test]
    fn empty_configuration_has_no_strategy() {
        assert!(build_strategies(&Config::default()).is_err());
    }

    #[test]
    fn strategy_is_asked_for_when_not_requested() {
        let strategies = build_strategies(&config()).unwrap();
        let mut prompt = ScriptedPrompt::new();
        prompt.start_session(&SessionParameters::default()).unwrap();

        prompt.push_choice(Some(1));
        let picked = select_strategy(&mut prompt, &strategies, None).unwrap();
        assert_eq!(picked.map(|s| s.name()), Some(PatternStrategy::NAME));

        prompt.push_choice(None);
        assert!(select_strategy(&mut prompt, &strategies, None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn requested_strategy_must_exist() {
        let strategies = build_strategies(&config()).unwrap();
        let mut prompt = ScriptedPrompt::new();
        let picked = select_strategy(&mut prompt, &strategies, Some("dictionary")).unwrap();
        assert_eq!(picked.map(|s| s.name()), Some(DictionaryStrategy::NAME));
        assert!(select_strategy(&mut prompt, &strategies, Some("grammar")).is_err());
    }

    #[test]
    fn existing_target_is_reported_before_prompting() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        std::fs::write(&input, MOVIE).unwrap();
        let target = target_path(&input, None, false);
        std::fs::write(&target, "keep me").unwrap();

        let strategies = build_strategies(&config()).unwrap();
        let mut prompt = ScriptedPrompt::new();
        let mut session = CorrectionSession::start(&mut prompt, &SessionParameters::default()).unwrap();
        correct_one(&mut session, &*strategies[0], &input, &target, encoding_rs::UTF_8, false).unwrap();
        let stats = session.finish().unwrap();

        assert_eq!(stats.candidates, 0);
        assert!(prompt.confirmations.is_empty());
        assert_eq!(prompt.notices.len(), 1);
        assert_eq!(prompt.notices[0].0, Level::Error);
        assert!(prompt.notices[0].1.starts_with(keys::WRITE_FAILED));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "keep me");
    }

    #[test]
    fn corrected_file_is_written_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        std::fs::write(&input, MOVIE).unwrap();
        let target = target_path(&input, None, false);

        let strategies = build_strategies(&config()).unwrap();
        let mut prompt = ScriptedPrompt::with_decisions(vec![UserDecision::accept("there", false)]);
        let mut session = CorrectionSession::start(&mut prompt, &SessionParameters::default()).unwrap();
        correct_one(&mut session, &*strategies[0], &input, &target, encoding_rs::UTF_8, false).unwrap();
        session.finish().unwrap();

        let written = parser::read_file(&target, encoding_rs::UTF_8).unwrap();
        assert_eq!(
            written.subtitles()[0].content.as_deref(),
            Some("l know there is more")
        );
        assert_eq!(prompt.notices[0].0, Level::Information);
    }

    #[test]
    fn replacement_outside_the_charset_is_warned() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        std::fs::write(&input, MOVIE).unwrap();
        let target = target_path(&input, None, false);

        let strategies = build_strategies(&config()).unwrap();
        let mut prompt =
            ScriptedPrompt::with_decisions(vec![UserDecision::accept("\u{141}\u{f3}d\u{17a}", false)]);
        let mut session = CorrectionSession::start(&mut prompt, &SessionParameters::default()).unwrap();
        correct_one(
            &mut session,
            &*strategies[0],
            &input,
            &target,
            encoding_rs::WINDOWS_1252,
            false,
        )
        .unwrap();
        session.finish().unwrap();

        let levels: Vec<Level> = prompt.notices.iter().map(|(level, _)| *level).collect();
        assert_eq!(levels, [Level::Warning, Level::Information]);
        assert!(prompt.notices[0].1.starts_with(keys::UNENCODABLE));
    }

    #[test]
    fn read_failure_skips_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.srt");
        let target = target_path(&input, None, false);

        let strategies = build_strategies(&config()).unwrap();
        let mut prompt = ScriptedPrompt::new();
        let mut session = CorrectionSession::start(&mut prompt, &SessionParameters::default()).unwrap();
        correct_one(&mut session, &*strategies[0], &input, &target, encoding_rs::UTF_8, false).unwrap();
        session.finish().unwrap();

        assert_eq!(prompt.notices[0].0, Level::Error);
        assert!(prompt.notices[0].1.starts_with(keys::READ_FAILED));
        assert!(!target.exists());
    }
}
