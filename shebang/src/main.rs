use std::{env, iter, process::ExitCode};

use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use shebang::{dispatch, flatten_args, AliasSources, Invocation, ShellLauncher};
use tracing_subscriber::EnvFilter;

const META_HELP: &str = r#"Meta-strings:
  !(name)  command defined by name in a .shebang_alias file
  !@       target
  !-       target with the file extension removed
  !<       target's directory
  !>       target's filename
  !.       target's path
  !~       copy of target without the #! line, as a fifo. It is written once,
           so use it once per command
  !+       same as !~, but a regular temp file, for programs that don't
           read fifos well

Aliases:
  .shebang_alias files hold one `name = command` per line; lines starting
  with # are comments. Commands may use meta-strings and aliases defined
  after them. Aliases are not recursive. Files are read in this order:
    <target's directory>/.shebang_alias
    ./.shebang_alias
    ~/.shebang_alias
    /etc/.shebang_alias
  For example, with `c = gcc -o !- !~ && !-; rm !-` a C file can start with
    #!/usr/bin/shebang "!(c)"

Arguments are joined and split again on single spaces, so the target and
the command can't contain spaces of their own.

Set SHEBANG_LOG (e.g. SHEBANG_LOG=debug) for diagnostics on stderr."#;

#[derive(Parser, Debug)]
#[command(name = "shebang", version)]
#[command(about = "Run a script's #! line as a shell command")]
#[command(after_long_help = META_HELP)]
struct Cli {
    /// Display the final command before running it
    #[arg(short = 'd')]
    display: bool,

    /// Run against a temp copy of the target with its #! line removed
    #[arg(short = 'r')]
    strip: bool,

    /// Command template followed by the target
    #[arg(value_name = "COMMAND... TARGET", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

async fn run() -> Result<ExitCode> {
    let mut argv = env::args_os().map(|arg| arg.to_string_lossy().into_owned());
    let program = argv.next().unwrap_or_else(|| String::from("shebang"));
    let cli = Cli::parse_from(iter::once(program).chain(flatten_args(argv)));

    let invocation = match Invocation::from_tokens(&cli.args, cli.display, cli.strip) {
        Some(invocation) => invocation,
        None => {
            Cli::command().print_long_help()?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    let target = invocation.target();
    let sources = AliasSources::standard(target.directory_path());
    let mut launcher = ShellLauncher::default();

    let code = dispatch(&invocation, &sources, &mut launcher).await?;

    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SHEBANG_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "shebang:".red(), e);
            ExitCode::FAILURE
        }
    }
}
