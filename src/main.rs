use clap::{Parser, Subcommand, ValueEnum};
use photolog::commands::{self, BuildOptions, SitePaths};
use photolog::imaging::{ImageBackend, MagickBackend, RustBackend};
use photolog::{Error, config, output, process};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use tracing::{Subscriber, warn};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Set by Ctrl-C; photos not yet started when it is set are skipped.
static CANCEL: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "photolog")]
#[command(about = "Static site generator for a chronological photo blog")]
#[command(long_about = "\
Static site generator for a chronological photo blog

One photo per post, newest first, with an index page and an RSS feed.

Source directory:

  site/
  ├── config.yaml          # Site config (run 'photolog gen-config')
  ├── data/photos.tsv      # Record store, one line per photo (append-only)
  ├── images/              # Originals, copied in by 'photolog add'
  └── templates/           # Page/feed templates and style.css

Output directory:

  public/
  ├── index.html           # Newest-first thumbnail grid
  ├── photo/index.html     # Same page again
  ├── photo/{id}/index.html
  ├── images/{id}/         # thumb_{file}, {width}_{file}
  ├── index.xml            # RSS feed
  └── style.css            # Copied once, never overwritten

Start with 'photolog init', then 'photolog add photo.jpg --build'.")]
#[command(version)]
struct Cli {
    /// Site source directory
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "public", global = true)]
    output: PathBuf,

    /// Template directory [default: <SOURCE>/templates]
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    /// Image processing backend
    #[arg(long, value_enum, default_value_t = BackendKind::Rust, global = true)]
    backend: BackendKind,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendKind {
    /// Built-in, no external tools
    Rust,
    /// ImageMagick `convert` and `mogrify` on PATH
    #[value(name = "imagemagick")]
    ImageMagick,
}

/// Shared flags for commands that build.
#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Render nothing if any photo's images fail
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create config, templates, images/ and an empty store
    Init,
    /// Register a photo: copy it into images/ and append the next ID
    Add {
        /// Image file to register
        reference: PathBuf,
        /// Build the site afterwards
        #[arg(long)]
        build: bool,
        #[command(flatten)]
        build_args: BuildArgs,
    },
    /// Generate image variants and render every page
    Build(BuildArgs),
    /// Print all photos as JSON
    List,
    /// Print a stock config.yaml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing::subscriber::with_default(subscriber(cli.verbose), || match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.diagnostic());
            ExitCode::FAILURE
        }
    })
}

/// Logging for one invocation, installed for the duration of [`run`] only.
fn subscriber(verbose: bool) -> impl Subscriber + Send + Sync {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    Registry::default()
        .with(
            fmt::Layer::default()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
}

fn run(cli: &Cli) -> Result<(), Error> {
    let paths = SitePaths {
        source: cli.source.clone(),
        output: cli.output.clone(),
        templates: cli.templates.clone(),
    };

    match &cli.command {
        Command::Init => {
            let report = commands::init(&paths)?;
            output::print_init_output(&report, &paths.source);
        }
        Command::Add {
            reference,
            build,
            build_args,
        } => {
            let record = commands::register(&paths, reference)?;
            output::print_register_output(&record);
            if *build {
                run_build(cli, &paths, build_args)?;
            }
        }
        Command::Build(build_args) => run_build(cli, &paths, build_args)?,
        Command::List => {
            let photos = commands::list(&paths)?;
            let json = serde_json::to_string_pretty(&photos).map_err(|e| Error::Io {
                path: paths.source.clone(),
                source: e.into(),
            })?;
            println!("{}", json);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_yaml());
        }
    }

    Ok(())
}

fn run_build(cli: &Cli, paths: &SitePaths, args: &BuildArgs) -> Result<(), Error> {
    let backend: Box<dyn ImageBackend> = match cli.backend {
        BackendKind::Rust => Box::new(RustBackend::new()),
        BackendKind::ImageMagick => Box::new(MagickBackend::new()),
    };

    // A first Ctrl-C lets photos in flight finish; a second one exits.
    if let Err(e) = ctrlc::set_handler(|| {
        if process::request_cancel(&CANCEL) {
            std::process::exit(130);
        }
        eprintln!("interrupted: finishing photos in progress");
    }) {
        warn!(error = %e, "cannot install Ctrl-C handler");
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = commands::build(
        paths,
        backend.as_ref(),
        BuildOptions {
            fail_fast: args.fail_fast,
            progress: Some(tx),
        },
        &CANCEL,
    );
    // The sender is dropped with the build, which ends the printer loop.
    if printer.join().is_err() {
        warn!("progress printer panicked");
    }

    let report = result?;
    output::print_build_output(&report, &paths.output);
    if !report.images.is_complete() {
        return Err(Error::ImagesIncomplete(report.images.failed_ids()));
    }
    Ok(())
}
