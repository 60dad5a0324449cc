use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct SourceOpts {
    #[arg(
        value_name = "REPO",
        help = "Repository URL to clone (https://, git@, ssh://) or a local directory."
    )]
    pub repo: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOpts {
    #[arg(
        long,
        help = "Path/filename of the TOML config file (default: <config dir>/rendergit/rendergit.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "no_config",
        help_heading = "Configuration"
    )]
    pub config: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config",
        help_heading = "Configuration"
    )]
    pub no_config: bool,

    #[arg(
        long,
        value_name = "BYTES",
        help = "Max file size to render; larger files are listed but skipped [default: 51200].",
        help_heading = "Classification"
    )]
    pub max_bytes: Option<u64>,

    #[arg(
        long = "ignore",
        value_name = "GLOB",
        help = "Extra glob of paths to ignore (repeatable; a trailing '/' matches a whole directory).",
        help_heading = "Classification"
    )]
    pub ignore: Vec<String>,

    #[arg(
        long,
        help = "Never run the external `tree` tool; always use the built-in listing.",
        help_heading = "Classification"
    )]
    pub no_tree_command: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StructuredOutputOpts {
    #[arg(short = 'f', long, help = "Print structured output instead of a table.", value_name = "FORMAT", value_parser = ["json", "yaml", "xml"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Compact (minified) JSON output.",
        help_heading = "Output Formatting"
    )]
    pub json_minify: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Flatten a repository into one browsable page.",
    long_about = "rendergit classifies every file in a repository (text, binary, too large, VCS metadata), \nthen renders the text files into a single HTML page with navigation and statistics, \nor exports them as one flattened document for language models.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  rendergit render https://github.com/owner/repo\n  rendergit render . -o page.html --no-open\n  rendergit flatten . -f json > repo.json\n  rendergit scan . --excluded\n  rendergit cache prune",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "r",
        about = "Render a repository into a single HTML page."
    )]
    Render(RenderArgs),

    #[command(
        visible_alias = "f",
        about = "Export every rendered file as one flattened document."
    )]
    Flatten(FlattenArgs),

    #[command(
        visible_alias = "s",
        about = "Show how each file is classified."
    )]
    Scan(ScanArgs),

    #[command(
        visible_alias = "m",
        about = "Calculate repository statistics and estimated tokens."
    )]
    Stats(StatsArgs),

    #[command(about = "Inspect or maintain the render cache.")]
    Cache(CacheArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),

    #[command(about = "Show or save the default configuration file.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[clap(flatten)]
    pub source: SourceOpts,
    #[clap(flatten)]
    pub config_opts: ConfigOpts,

    #[arg(
        short = 'o',
        long,
        value_name = "PATH",
        help = "Output HTML file (default: <temp dir>/<repo name>.html).",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Don't open the page in a browser after writing it.",
        help_heading = "Output Control"
    )]
    pub no_open: bool,

    #[arg(
        long,
        help = "Serve from and store into the render cache.",
        help_heading = "Output Control"
    )]
    pub cache: bool,

    #[arg(
        long,
        requires = "cache",
        help = "Ignore any cached page and re-render (the result is still stored).",
        help_heading = "Output Control"
    )]
    pub refresh: bool,

    #[arg(
        long,
        value_name = "THEME",
        help = "Syntax highlighting theme [default: InspiredGitHub].",
        help_heading = "Rendering"
    )]
    pub theme: Option<String>,

    #[arg(
        long,
        help = "Render every file as escaped plain text.",
        help_heading = "Rendering"
    )]
    pub plain: bool,

    #[arg(
        long,
        help = "Omit the repository statistics blocks.",
        help_heading = "Rendering"
    )]
    pub no_stats: bool,

    #[arg(
        long,
        help = "Omit the embedded flattened (LLM) view.",
        help_heading = "Rendering"
    )]
    pub no_llm_view: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FlattenArgs {
    #[clap(flatten)]
    pub source: SourceOpts,
    #[clap(flatten)]
    pub config_opts: ConfigOpts,

    #[arg(short = 'f', long, help = "Flattened document format [default: cxml].", value_name = "FORMAT", value_parser = ["cxml", "json", "yaml", "xml"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Compact (minified) JSON output.",
        help_heading = "Output Formatting"
    )]
    pub json_minify: bool,

    #[arg(
        short = 'o',
        long,
        value_name = "PATH",
        help = "Write to a file instead of standard output.",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    #[clap(flatten)]
    pub source: SourceOpts,
    #[clap(flatten)]
    pub config_opts: ConfigOpts,
    #[clap(flatten)]
    pub format_output: StructuredOutputOpts,

    #[arg(long, help = "List only files that will not be rendered.")]
    pub excluded: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[clap(flatten)]
    pub source: SourceOpts,
    #[clap(flatten)]
    pub config_opts: ConfigOpts,
    #[clap(flatten)]
    pub format_output: StructuredOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    #[clap(flatten)]
    pub config_opts: ConfigOpts,
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    #[command(about = "List cached pages, most recently used first.")]
    List {},
    #[command(about = "Remove expired pages and enforce the capacity limit.")]
    Prune {},
    #[command(about = "Remove every cached page.")]
    Clear {},
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        long,
        help = "Save default config to the default path (prompts overwrite)."
    )]
    pub save: bool,
}
