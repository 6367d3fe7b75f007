use std::{
    fs::{self, File},
    io::{self, stdin, stdout, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use thiserror::Error;

use msgscript::{
    binary::{self, BinaryError, Endian},
    compiler::{compile_source, CompilerOptions, ScriptError},
    decompiler::{DecompileError, Decompiler},
    diagnostics::LogSink,
    library::FunctionLibrary,
    model::FormatVersion,
};

#[derive(Debug, Error)]
enum Error {
    #[error("Script Error: {0}")]
    ScriptError(#[from] ScriptError),

    #[error("Binary error: {0}")]
    BinaryFailed(#[from] BinaryError),

    #[error("Decompile error: {0}")]
    DecompileFailed(#[from] DecompileError),

    #[error("Library error: {0}")]
    LibraryError(#[from] serde_json::Error),

    #[error("IO Error: {0}")]
    IoError(#[from] io::Error),

    #[error("CLI Error: {0}")]
    CliError(String),
}

#[derive(Subcommand)]
enum Command {
    /// Compile tag-syntax source into a binary container
    Compile {
        /// Input source to compile (default: stdin)
        input: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Function library for named tags (JSON)
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Reject integer arguments that do not fit their field
        #[arg(long)]
        strict: bool,

        /// Emit a big-endian container
        #[arg(long)]
        big_endian: bool,

        /// Text encoding for non-ASCII free text (e.g. shift_jis)
        #[arg(long)]
        encoding: Option<String>,

        /// User id stored in the container header
        #[arg(long, default_value_t = 0)]
        user_id: i16,
    },

    /// Decompile a binary container into tag-syntax source
    Decompile {
        /// Input binary
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Function library for tag names (JSON)
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Drop function tokens the library marks @Unused
        #[arg(long)]
        omit_unused: bool,

        /// Read a forward-magic container as big-endian
        #[arg(long)]
        big_endian_hint: bool,
    },
}

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

fn load_library(path: &Path) -> Result<FunctionLibrary, Error> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

fn main_error() -> Result<(), Error> {
    let args = Args::parse();

    match args.command {
        Command::Compile {
            input,
            output,
            library,
            strict,
            big_endian,
            encoding,
            user_id,
        } => {
            let source = match input {
                Some(path) => fs::read_to_string(path)?,
                None => io::read_to_string(stdin().lock())?,
            };

            let library = library.as_deref().map(load_library).transpose()?;

            let encoding = match &encoding {
                Some(label) => Some(
                    encoding_rs::Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                        Error::CliError(format!("unknown encoding '{label}'"))
                    })?,
                ),
                None => None,
            };

            let opts = CompilerOptions {
                library: library.as_ref(),
                encoding,
                strict_args: strict,
                version: if big_endian {
                    FormatVersion::Version1BigEndian
                } else {
                    FormatVersion::Version1
                },
                user_id,
            };

            let script = compile_source(&source, &opts, &mut LogSink)?;
            let data = binary::encode_script(&script)?;

            match output {
                Some(path) => fs::write(path, data)?,
                None => {
                    stdout().write_all(&data)?;
                }
            }

            Ok(())
        }

        Command::Decompile {
            input,
            output,
            library,
            omit_unused,
            big_endian_hint,
        } => {
            let mut data = Vec::new();
            File::open(input)?.read_to_end(&mut data)?;

            let hint = big_endian_hint.then_some(Endian::Big);
            let script = binary::decode_script_with_hint(&data, hint)?;

            let library = library.as_deref().map(load_library).transpose()?;

            let decompile = |out: &mut dyn Write| -> Result<(), Error> {
                let mut decompiler = Decompiler::new(out).omit_unused(omit_unused);

                if let Some(library) = &library {
                    decompiler = decompiler.with_library(library);
                }

                decompiler.decompile(&script)?;
                Ok(())
            };

            match output {
                Some(path) => {
                    let mut buf_write = BufWriter::new(File::create(path)?);
                    decompile(&mut buf_write)?;
                    buf_write.flush()?;
                }

                None => decompile(&mut stdout().lock())?,
            }

            Ok(())
        }
    }
}

fn main() -> Result<(), ()> {
    env_logger::init();

    match main_error() {
        Ok(_) => Ok(()),

        Err(err) => {
            eprintln!("{0}", err);
            Err(())
        }
    }
}
