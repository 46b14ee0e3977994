use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use drumlog_core::history::{
    completion_message, format_clock, format_duration_long, format_duration_short,
};
use drumlog_core::*;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drumlog")]
#[command(about = "Drum practice tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List exercises, optionally filtered
    Exercises {
        /// Keep exercises training any of these skills (repeatable)
        #[arg(long = "skill")]
        skills: Vec<String>,

        /// Time range preset (quick, short, medium, long)
        #[arg(long, conflicts_with_all = ["min", "max"])]
        time: Option<String>,

        /// Minimum estimated minutes
        #[arg(long, requires = "max")]
        min: Option<u32>,

        /// Maximum estimated minutes
        #[arg(long, requires = "min")]
        max: Option<u32>,

        /// Case-insensitive text search in name and description
        #[arg(long)]
        query: Option<String>,
    },

    /// Run a practice session
    Practice {
        /// Exercise ids, in practice order
        exercise_ids: Vec<String>,

        /// Start a new session with the exercises of a stored session
        #[arg(long, conflicts_with = "exercise_ids")]
        repeat: Option<String>,

        /// Auto-complete (for testing) - mark every exercise done immediately
        #[arg(long, conflicts_with = "auto_skip")]
        auto_complete: bool,

        /// Auto-skip (for testing) - skip every exercise
        #[arg(long, conflicts_with = "auto_complete")]
        auto_skip: bool,
    },

    /// List past sessions, newest first
    History,

    /// Show one session in detail
    Show {
        session_id: String,
    },

    /// Show progress statistics
    Progress {
        /// Detailed statistics for one exercise
        #[arg(long)]
        exercise: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    drumlog_core::logging::init_with_level(drumlog_core::logging::level_for_verbosity(
        cli.verbose,
    ));

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());

    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    let mut repo = PracticeRepository::new(FileStore::new(&data_dir));

    match cli.command {
        Some(Commands::Exercises {
            skills,
            time,
            min,
            max,
            query,
        }) => {
            let mut criteria = ExerciseFilter::new();
            criteria.skills = skills.into_iter().collect();
            criteria.time_range = match (time, min, max) {
                (Some(id), _, _) => Some(TimeRangeSelection::Preset(id)),
                (None, Some(min), Some(max)) => Some(TimeRangeSelection::Minutes { min, max }),
                _ => None,
            };
            criteria.query = query;
            cmd_exercises(catalog, &criteria)
        }
        Some(Commands::Practice {
            exercise_ids,
            repeat,
            auto_complete,
            auto_skip,
        }) => {
            let selection = match repeat {
                Some(session_id) => repo
                    .find_session(&session_id)
                    .map(|s| Selection::from_session(&s))
                    .ok_or_else(|| Error::Other(format!("No session with id '{}'", session_id)))?,
                None => {
                    let mut selection = Selection::new();
                    for exercise in catalog.resolve_ids(&exercise_ids)? {
                        if !selection.contains(&exercise.id) {
                            selection.toggle(&exercise);
                        }
                    }
                    selection
                }
            };
            let exercises = selection.into_exercises()?;
            let mode = if auto_complete {
                PracticeMode::AutoComplete
            } else if auto_skip {
                PracticeMode::AutoSkip
            } else {
                PracticeMode::Interactive
            };
            cmd_practice(&mut repo, exercises, mode, &config)
        }
        Some(Commands::History) => cmd_history(&repo, &config),
        Some(Commands::Show { session_id }) => cmd_show(&repo, &session_id),
        Some(Commands::Progress { exercise }) => cmd_progress(&repo, catalog, exercise, &config),
        None => cmd_home(&repo),
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format("%a, %b %-d, %Y %H:%M")
        .to_string()
}

fn cmd_home(repo: &PracticeRepository<FileStore>) -> Result<()> {
    let sessions = repo.practice_sessions();
    println!("\nDrum Practice");
    println!("Improve your skills, one session at a time\n");
    match sessions.first() {
        Some(last) => println!(
            "  {} sessions recorded, last on {}",
            sessions.len(),
            format_date(last.date)
        ),
        None => println!("  No sessions yet"),
    }
    println!();
    println!("  drumlog exercises          browse and filter exercises");
    println!("  drumlog practice <ID>...   start a new practice");
    println!("  drumlog history            view history");
    println!("  drumlog progress           view progress");
    Ok(())
}

fn cmd_exercises(catalog: &CatalogRepository, criteria: &ExerciseFilter) -> Result<()> {
    let found = catalog.filter(criteria)?;

    println!("Available Exercises ({})", found.len());
    for ex in found {
        println!();
        println!("  {}  [{}]", ex.name, ex.id);
        println!("    {}", ex.description);
        println!(
            "    {} · {} min · {} · {} BPM · {}",
            ex.category.display_name(),
            ex.estimated_time,
            ex.difficulty.as_str(),
            ex.default_tempo,
            ex.skills.join(", ")
        );
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PracticeMode {
    Interactive,
    AutoComplete,
    AutoSkip,
}

enum UserAction {
    Done,
    Skip,
    Faster,
    Slower,
    SetTempo(u32),
    ToggleMetronome,
    Quit,
    Help,
}

fn cmd_practice(
    repo: &mut PracticeRepository<FileStore>,
    exercises: Vec<Exercise>,
    mode: PracticeMode,
    config: &Config,
) -> Result<()> {
    let clock = SystemClock;
    let total = exercises.len();
    let mut recorder = SessionRecorder::begin(exercises, clock)?;
    let mut timers = PracticeTimers::start(
        recorder.tempo(),
        config.metronome.beats_per_bar,
        clock.now(),
    );
    let step = config.metronome.tempo_step as i32;

    while let Some(index) = recorder.current_index() {
        let Some(exercise) = recorder.current_exercise().cloned() else {
            break;
        };
        let events = timers.poll(clock.now());
        tracing::debug!(
            "{} display ticks, {} clicks since last prompt",
            events.display_ticks,
            events.clicks.len()
        );
        display_exercise(&exercise, index, total, &recorder, &timers, events.clicks.len());

        let action = match mode {
            PracticeMode::AutoComplete => UserAction::Done,
            PracticeMode::AutoSkip => UserAction::Skip,
            PracticeMode::Interactive => prompt_user_action()?,
        };

        match action {
            UserAction::Done => {
                let done = recorder.complete_at_live_tempo(repo)?;
                println!(
                    "\n✓ {} done: {} at {} BPM",
                    done.result.exercise_name,
                    format_duration_short(done.result.duration),
                    done.result.tempo
                );
                if !done.progress_saved {
                    eprintln!("! Progress for this exercise could not be saved.");
                }
                timers.next_exercise(recorder.tempo(), clock.now());
            }
            UserAction::Skip => {
                if mode == PracticeMode::Interactive
                    && !confirm("Are you sure you want to skip this exercise? [y/N] ")?
                {
                    continue;
                }
                recorder.skip_current()?;
                println!("\n→ Skipped {}", exercise.name);
                timers.next_exercise(recorder.tempo(), clock.now());
            }
            UserAction::Faster | UserAction::Slower => {
                let delta = if matches!(action, UserAction::Faster) { step } else { -step };
                let tempo = recorder.adjust_tempo(delta);
                timers.metronome_mut().set_tempo(tempo, clock.now());
            }
            UserAction::SetTempo(bpm) => {
                let tempo = recorder.set_tempo(bpm);
                timers.metronome_mut().set_tempo(tempo, clock.now());
            }
            UserAction::ToggleMetronome => {
                let playing = timers.metronome_mut().toggle(clock.now());
                println!("Metronome {}", if playing { "on" } else { "off" });
            }
            UserAction::Quit => {
                timers.stop_all();
                println!("\nSession abandoned. Progress for completed exercises was kept.");
                return Ok(());
            }
            UserAction::Help => print_practice_help(),
        }
    }

    timers.stop_all();

    loop {
        match recorder.finish(repo) {
            Ok(session) => {
                print_session_saved(&session);
                return Ok(());
            }
            Err(e) => {
                eprintln!("! The session could not be saved: {}", e);
                if mode == PracticeMode::Interactive && confirm("Retry saving? [y/N] ")? {
                    continue;
                }
                return Err(e);
            }
        }
    }
}

fn print_session_saved(session: &PracticeSession) {
    println!("\n✓ Session saved!");
    println!("  Session Complete! {}", completion_message(session));
    println!(
        "  {} of {} exercises completed, id {}",
        session.exercise_data.len(),
        session.exercises.len(),
        session.id
    );
}

fn display_exercise(
    exercise: &Exercise,
    index: usize,
    total: usize,
    recorder: &SessionRecorder<SystemClock>,
    timers: &PracticeTimers,
    clicks: usize,
) {
    let metronome = timers.metronome();
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  Exercise {} of {}", index + 1, total);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  {}", exercise.name);
    println!("  {}", exercise.description);
    println!();
    println!("  Elapsed: {}", format_clock(timers.display_secs()));
    if metronome.is_playing() {
        println!(
            "  Tempo: {} BPM (metronome on, {} clicks, next beat {})",
            recorder.tempo(),
            clicks,
            metronome.current_beat() + 1
        );
    } else {
        println!("  Tempo: {} BPM", recorder.tempo());
    }
    println!();
}

fn print_practice_help() {
    println!("─────────────────────────────────────────");
    println!("Press Enter when done");
    println!("  's' + Enter to skip");
    println!("  '+' / '-' + Enter to change tempo");
    println!("  't <bpm>' + Enter to set tempo");
    println!("  'm' + Enter to toggle the metronome");
    println!("  'q' + Enter to stop practicing");
}

fn read_line() -> Result<Option<String>> {
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn prompt_user_action() -> Result<UserAction> {
    print!("> ");
    io::stdout().flush()?;

    let Some(input) = read_line()? else {
        // stdin closed
        return Ok(UserAction::Quit);
    };

    let lowered = input.to_lowercase();
    let action = match lowered.as_str() {
        "" => UserAction::Done,
        "s" => UserAction::Skip,
        "+" => UserAction::Faster,
        "-" => UserAction::Slower,
        "m" => UserAction::ToggleMetronome,
        "q" => UserAction::Quit,
        other => match other.strip_prefix('t').map(str::trim).map(str::parse::<u32>) {
            Some(Ok(bpm)) => UserAction::SetTempo(bpm),
            _ => UserAction::Help,
        },
    };

    Ok(action)
}

fn confirm(question: &str) -> Result<bool> {
    print!("{}", question);
    io::stdout().flush()?;
    Ok(matches!(
        read_line()?.as_deref().map(str::to_lowercase).as_deref(),
        Some("y") | Some("yes")
    ))
}

fn cmd_history(repo: &PracticeRepository<FileStore>, config: &Config) -> Result<()> {
    let sessions = repo.practice_sessions();
    if sessions.is_empty() {
        println!("No practice history");
        println!("Your completed practice sessions will appear here");
        return Ok(());
    }

    println!("Practice History");
    for session in &sessions {
        let count = session.exercises.len();
        println!();
        println!("  {}  [{}]", format_date(session.date), session.id);
        println!(
            "    {} · {} exercise{}",
            format_duration_short(session.total_duration),
            count,
            if count == 1 { "" } else { "s" }
        );
        let preview = session.preview(config.history.preview_count);
        for name in &preview.names {
            println!("    • {}", name);
        }
        if preview.more > 0 {
            println!("    +{} more", preview.more);
        }
    }
    Ok(())
}

fn cmd_show(repo: &PracticeRepository<FileStore>, session_id: &str) -> Result<()> {
    let session = repo
        .find_session(session_id)
        .ok_or_else(|| Error::Other(format!("No session with id '{}'", session_id)))?;

    let count = session.exercises.len();
    println!("{}", format_date(session.date));
    println!(
        "Total Duration: {}",
        format_duration_long(session.total_duration)
    );
    println!("{} Exercise{}", count, if count == 1 { "" } else { "s" });
    println!();
    println!("Exercises Practiced");
    for entry in &session.exercises {
        println!();
        println!("  {}", entry.exercise.name);
        println!("    {}", entry.exercise.description);
        match session.result_for(&entry.exercise.id) {
            Some(result) => {
                println!("    Duration: {}", format_duration_long(result.duration));
                println!("    Tempo: {} BPM", result.tempo);
            }
            None => println!("    Skipped"),
        }
    }
    Ok(())
}

fn cmd_progress(
    repo: &PracticeRepository<FileStore>,
    catalog: &CatalogRepository,
    exercise: Option<String>,
    config: &Config,
) -> Result<()> {
    let progress = repo.progress_data();

    if let Some(id) = exercise {
        let known = catalog
            .get(&id)
            .ok_or_else(|| Error::Other(format!("Unknown exercise id '{}'", id)))?;
        let Some(stats) = progress.get(&id).and_then(|entries| summarize(entries)) else {
            println!("{}", known.name);
            println!("  No progress recorded yet");
            return Ok(());
        };

        println!("{}", known.name);
        println!("  Sessions:         {}", stats.sessions);
        println!("  Average Duration: {}", format_clock(stats.avg_duration));
        println!("  Max Duration:     {}", format_clock(stats.max_duration));
        println!("  Average Tempo:    {} BPM", stats.avg_tempo);
        println!("  Tempo Range:      {} - {} BPM", stats.min_tempo, stats.max_tempo);
        println!();
        println!("  Recent Sessions");
        for entry in stats.recent(config.history.recent_limit, Direction::NewestFirst) {
            println!(
                "    {}  {}  {} BPM",
                format_date(entry.date),
                format_clock(entry.duration),
                entry.tempo
            );
        }
        return Ok(());
    }

    let ranked = rank_exercises(catalog, &progress);
    if ranked.is_empty() {
        println!("No progress data yet");
        println!("Complete some practice sessions to see your progress here");
        return Ok(());
    }

    let totals = overview(&progress);
    println!("Your Progress");
    println!(
        "  {} exercises practiced, {} total\n",
        totals.exercises_practiced,
        format_duration_short(totals.total_seconds)
    );
    for item in &ranked {
        let n = item.stats.sessions;
        println!(
            "  {:<32} {} session{}  avg {} BPM",
            item.exercise.name,
            n,
            if n == 1 { "" } else { "s" },
            item.stats.avg_tempo
        );
    }
    tracing::debug!("Ranked {} exercises", ranked.len());
    Ok(())
}
