use std::path::{Path, PathBuf};

use clap::{error::ErrorKind, CommandFactory, Parser as ClapParser, ValueEnum};
use colored::Colorize;
use itertools::Itertools;
use sprigc::{
    backend::emit::emit,
    check,
    context::{CompilationContext, CompileOptions, DEFAULT_RUNTIME_MODULE},
    error::CompileResult,
    frontend::{
        imports::collect_requires, lexer::tokenize, reader::read, SourceFile, SourceFileOrigin,
    },
    module_header, normalize, parse_source,
};

/// Output of the pipeline to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stage {
    Tokens,
    Sexpr,
    Ast,
    Typed,
    Anf,
    Js,
}

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    source_files: Vec<PathBuf>,

    /// Directory to write compiled modules to (defaults to next to the source)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Print an intermediate stage instead of writing JavaScript
    #[arg(long, value_enum, default_value_t = Stage::Js)]
    emit: Stage,

    /// Check every scope, annotated or not
    #[arg(long)]
    strict: bool,

    #[arg(long)]
    no_typecheck: bool,

    #[arg(long)]
    no_tco: bool,

    /// Module the emitted code imports its runtime from
    #[arg(long, default_value = DEFAULT_RUNTIME_MODULE)]
    runtime: String,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    if args.source_files.is_empty() {
        Args::command()
            .error(ErrorKind::MissingRequiredArgument, "Missing source files!")
            .exit();
    }

    for source_file in &args.source_files {
        if !source_file.exists() {
            Args::command()
                .error(
                    ErrorKind::InvalidValue,
                    format!("Source file '{}' does not exist!", source_file.display()),
                )
                .exit()
        }

        if !source_file.is_file() {
            Args::command()
                .error(
                    ErrorKind::InvalidValue,
                    format!("Input path '{}' is not a file!", source_file.display()),
                )
                .exit()
        }
    }

    let options = CompileOptions {
        typecheck: !args.no_typecheck,
        tco: !args.no_tco,
        strict: args.strict,
        runtime: args.runtime.clone(),
    };

    /* Read in source files */

    let source_files = args
        .source_files
        .iter()
        .map(|path| match std::fs::read_to_string(path) {
            Ok(contents) => SourceFile::new(contents, SourceFileOrigin::File(path.clone())),
            Err(error) => Args::command()
                .error(
                    ErrorKind::Io,
                    format!("Failed to read '{}': {error}", path.display()),
                )
                .exit(),
        })
        .collect::<Vec<_>>();

    for source_file in &source_files {
        if let Err(error) = run(source_file, &args, options.clone()) {
            eprintln!("{error}");

            if let Some(location) = &error.location {
                source_file.highlight_location(location);
            }

            std::process::exit(1);
        }
    }
}

fn run(source_file: &SourceFile, args: &Args, options: CompileOptions) -> CompileResult<()> {
    let file = source_file.name();
    let source = source_file.contents.as_str();

    match args.emit {
        Stage::Tokens => {
            for token in tokenize(source, &file)? {
                println!("{} {:?} {}", token.location, token.kind, token.text);
            }

            return Ok(());
        }
        Stage::Sexpr => {
            for form in read(&tokenize(source, &file)?)? {
                println!("{form}");
            }

            return Ok(());
        }
        _ => {}
    }

    let mut ctx = CompilationContext::new(options)?;
    let program = parse_source(source, &file, &mut ctx)?;

    if let SourceFileOrigin::File(path) = &source_file.origin {
        for require in collect_requires(&program, path) {
            if !require.location.is_file() {
                log::warn!(
                    "module `{}` imported at {} not found at {}",
                    require.name,
                    require.source,
                    require.location.display()
                );
            }
        }
    }

    if args.emit == Stage::Ast {
        println!("{program}");
        return Ok(());
    }

    let program = check(program, &mut ctx)?;

    if args.emit == Stage::Typed {
        for node in &program.body {
            let ty = node
                .ty
                .as_ref()
                .map(|ty| ty.to_string())
                .unwrap_or_else(|| "?".dimmed().to_string());

            println!("{node}\n  {} {ty}", ":".white());
        }

        return Ok(());
    }

    let program = normalize(program, &mut ctx)?;

    if args.emit == Stage::Anf {
        println!("{}", program.body.iter().join("\n"));
        return Ok(());
    }

    let code = emit(&program, &mut ctx.namespace)?;
    let output = format!("{}\n{code}", module_header(&ctx.options));

    match &source_file.origin {
        SourceFileOrigin::File(path) => {
            let destination = output_path(path, args.out_dir.as_deref());

            if let Err(error) = std::fs::write(&destination, output) {
                Args::command()
                    .error(
                        ErrorKind::Io,
                        format!("Failed to write '{}': {error}", destination.display()),
                    )
                    .exit()
            }

            log::info!("wrote {}", destination.display());
        }
        SourceFileOrigin::Memory => print!("{output}"),
    }

    Ok(())
}

fn output_path(source: &Path, out_dir: Option<&Path>) -> PathBuf {
    let file_name = source
        .with_extension("js")
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("out.js"));

    match out_dir {
        Some(directory) => directory.join(file_name),
        None => source.with_extension("js"),
    }
}
