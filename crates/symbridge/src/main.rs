mod console;
mod import;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use symbridge_core::error::SymbridgeError;
use symbridge_core::store::DebugStore;
use symbridge_protocol::disassembly::MalformedLinePolicy;
use symbridge_protocol::dispatcher::{Dispatcher, DispatcherConfig};
use symbridge_protocol::escape::unescape;
use symbridge_protocol::transport::{read_transcript, response_channel, ScriptedTransport};
use symbridge_utils::{
    default_log_file, info, init_file_logging, init_logging, init_logging_with_level, LogFormat, LogLevel, Settings,
};

use crate::console::{Annotator, ConsoleView};
use crate::import::read_label_file;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Debug symbol store and debugger protocol bridge for natively compiled managed code.
#[derive(Parser, Debug)]
#[command(name = "symbridge")]
#[command(version)]
#[command(about = "Debug symbol store and debugger protocol bridge", long_about = None)]
struct Cli
{
    /// Debug store to use (defaults to $SYMBRIDGE_STORE)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    /// Log to a file only, keeping the console for command output
    /// (defaults to a dated file under ~/.symbridge)
    #[arg(long, global = true, value_name = "PATH", num_args = 0..=1)]
    #[allow(clippy::option_option)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Load `address label` pairs from a text file into the store
    ImportLabels
    {
        /// Label file, one `address label` pair per line
        file: PathBuf,
        /// Recreate the store before importing
        #[arg(long, default_value_t = false)]
        fresh: bool,
    },
    /// List every label in the store
    Labels,
    /// Show the method symbol for a label, with the method's locals and arguments
    Symbol
    {
        /// Native label name
        label: String,
    },
    /// Show field groups and layouts
    Fields
    {
        /// Only this type
        type_name: Option<String>,
    },
    /// Replay a recorded debugger transcript through the dispatcher
    Replay
    {
        /// Transcript file (`> command` lines followed by output)
        transcript: PathBuf,
        /// Skip unparsable disassembly lines instead of failing the listing
        #[arg(long, default_value_t = false)]
        skip_malformed: bool,
        /// Send the refresh commands after every stop (the transcript usually records them already)
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },
}

fn main()
{
    let cli = Cli::parse();

    // Keep the guard alive for the whole run so file output is flushed
    let logging = match (&cli.log_file, cli.log_level) {
        (Some(path), level) => {
            let path = path.clone().unwrap_or_else(default_log_file);
            init_file_logging(&path, level)
        }
        (None, Some(level)) => init_logging_with_level(level, cli.log_format),
        (None, None) => init_logging(),
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> CliResult<()>
{
    let settings = Settings::from_env()?;
    let store_path = cli.store.or_else(|| settings.store.clone());

    match cli.command {
        Commands::ImportLabels { file, fresh } => {
            let store = open_store(store_path.as_deref(), fresh)?;
            let labels = read_label_file(&file)?;
            store.write_labels(&labels)?;
            println!("Imported {} labels from {}", labels.len(), file.display());
            store.close()?;
        }
        Commands::Labels => {
            let store = open_store(store_path.as_deref(), false)?;
            for label in store.load_label_table()?.iter() {
                println!("{}  {}", label.address, label.label_name);
            }
            store.close()?;
        }
        Commands::Symbol { label } => {
            let store = open_store(store_path.as_deref(), false)?;
            print_symbol(&store, &label)?;
            store.close()?;
        }
        Commands::Fields { type_name } => {
            let store = open_store(store_path.as_deref(), false)?;
            print_fields(&store, type_name.as_deref())?;
            store.close()?;
        }
        Commands::Replay {
            transcript,
            skip_malformed,
            refresh,
        } => {
            let annotator = match store_path.as_deref() {
                Some(path) => Some(Annotator::new(open_store(Some(path), false)?)?),
                None => None,
            };
            let policy = if skip_malformed || settings.skip_malformed {
                MalformedLinePolicy::Skip
            } else {
                MalformedLinePolicy::Abort
            };
            let refresh_commands = if refresh {
                settings
                    .refresh_commands
                    .unwrap_or_else(|| DispatcherConfig::default().refresh_commands)
            } else {
                Vec::new()
            };
            replay(
                &transcript,
                annotator,
                DispatcherConfig {
                    malformed_lines: policy,
                    refresh_commands,
                },
            )?;
        }
    }
    Ok(())
}

fn open_store(path: Option<&Path>, fresh: bool) -> CliResult<DebugStore>
{
    let path = path.ok_or("no debug store given (use --store or set SYMBRIDGE_STORE)")?;
    info!("Opening debug store {}", path.display());
    Ok(DebugStore::create_or_open(path, fresh)?)
}

fn print_symbol(store: &DebugStore, label: &str) -> CliResult<()>
{
    match store.read_method_symbol(label)? {
        Some(symbol) => {
            println!("{symbol}");
            println!("  label:       {}", symbol.label_name);
            println!("  assembly:    {}", symbol.assembly_file);
            println!("  type token:  0x{:08X}", symbol.type_token);
            println!("  method token: 0x{:08X}", symbol.method_token);
            println!("  stack diff:  {}", symbol.stack_difference);
        }
        None => println!("No method symbol for {label}"),
    }

    let slots = store.read_local_argument_infos_for_method(label)?;
    if !slots.is_empty() {
        println!("locals and arguments:");
        for slot in slots {
            let element = if slot.is_array_element { " (array element)" } else { "" };
            println!("  {slot}{element}");
        }
    }
    Ok(())
}

fn print_fields(store: &DebugStore, type_name: Option<&str>) -> CliResult<()>
{
    let groups = match type_name {
        Some(type_name) => vec![store.read_field_group(type_name)?],
        None => store.read_all_field_groups()?,
    };

    for group in groups {
        if group.is_empty() {
            println!("{}: no fields recorded", group.type_name);
            continue;
        }
        println!("{}:", group.type_name);
        for field in &group.field_names {
            match store.read_field_layout(field) {
                Ok(layout) => println!("  +{:<5} {}", layout.offset, field),
                Err(SymbridgeError::NotFound { .. }) => println!("  {:<6} {}", "?", field),
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

fn replay(transcript: &Path, annotator: Option<Annotator>, config: DispatcherConfig) -> CliResult<()>
{
    let responses = read_transcript(transcript)?;
    let commands: Vec<String> = responses
        .iter()
        .filter(|response| !response.echo.is_empty())
        .map(|response| unescape(&response.echo))
        .collect();
    info!("Replaying {} commands from {}", commands.len(), transcript.display());

    let (sender, receiver) = response_channel();
    let transport = ScriptedTransport::new(responses, sender)?;
    let mut dispatcher = Dispatcher::new(transport, ConsoleView::views(annotator), config);

    dispatcher.drain(&receiver)?;
    for command in commands {
        println!("> {command}");
        dispatcher.submit(command)?;
        dispatcher.run_until_idle(&receiver)?;
    }
    Ok(())
}
