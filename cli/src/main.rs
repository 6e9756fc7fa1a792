use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use yang_json::*;

#[derive(Parser)]
#[command(name = "yjson")]
#[command(about = "Validate and canonicalize RFC 7951 JSON against a YANG schema", long_about = None)]
struct Cli {
    /// Log decoder decisions (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a JSON document and write it back in canonical form
    Normalize {
        #[command(flatten)]
        codec: CodecArgs,

        /// Input JSON document
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Indent the output
        #[arg(long)]
        pretty: bool,
    },

    /// Decode a JSON document and report whether it fits the schema
    Check {
        #[command(flatten)]
        codec: CodecArgs,

        /// Input JSON document
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the data tree of a schema document
    Schema {
        /// Schema document (JSON)
        #[arg(short, long)]
        schema: PathBuf,
    },
}

#[derive(Args)]
struct CodecArgs {
    /// Schema document (JSON)
    #[arg(short, long)]
    schema: PathBuf,

    /// Codec options file (JSON); flags below override it
    #[arg(long)]
    options: Option<PathBuf>,

    /// Skip members that match no schema node
    #[arg(long)]
    lenient: bool,

    /// Instance-identifier spelling
    #[arg(long, value_enum)]
    dialect: Option<DialectArg>,

    /// Codec cache policy
    #[arg(long, value_enum)]
    cache: Option<CacheArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Rfc7951,
    Lhotka02,
}

#[derive(Clone, Copy, ValueEnum)]
enum CacheArg {
    None,
    Lazy,
    Eager,
    Shared,
}

impl From<DialectArg> for IidDialect {
    fn from(arg: DialectArg) -> IidDialect {
        match arg {
            DialectArg::Rfc7951  => IidDialect::Rfc7951,
            DialectArg::Lhotka02 => IidDialect::Lhotka02,
        }
    }
}

impl From<CacheArg> for CachePolicy {
    fn from(arg: CacheArg) -> CachePolicy {
        match arg {
            CacheArg::None   => CachePolicy::None,
            CacheArg::Lazy   => CachePolicy::Lazy,
            CacheArg::Eager  => CachePolicy::Eager,
            CacheArg::Shared => CachePolicy::Shared,
        }
    }
}

impl CodecArgs {
    fn load(&self) -> Result<(Arc<SchemaContext>, CodecOptions), CodecError> {
        let mut options = match &self.options {
            Some(path) => CodecOptions::load(path)?,
            None => CodecOptions::default(),
        };
        options.lenient |= self.lenient;
        if let Some(dialect) = self.dialect {
            options.dialect = dialect.into();
        }
        if let Some(cache) = self.cache {
            options.cache = cache.into();
        }
        let context = load_schema(&self.schema)?;
        Ok((context, options))
    }
}

fn decode(codec: &CodecArgs, input: &Path) -> Result<(Arc<SchemaContext>, CodecOptions, NormalizationResult), CodecError> {
    let (context, options) = codec.load()?;
    let reader = BufReader::new(File::open(input)?);
    let result = from_json_reader(&context, reader, &options)?;
    info!(input = %input.display(), nodes = result.data.len(), "decoded document");
    Ok((context, options, result))
}

fn normalized_message(input: &Path, output: &Path) -> String {
    format!("Normalized {} -> {}", input.display(), output.display())
}

fn count_nodes(nodes: &[NormalizedNode]) -> usize {
    nodes.iter().map(|n| 1 + count_nodes(n.children())).sum()
}

fn type_name(type_def: &TypeDefinition) -> &'static str {
    match type_def {
        TypeDefinition::Boolean               => "boolean",
        TypeDefinition::Empty                 => "empty",
        TypeDefinition::Integer(t)            => t.kind.name(),
        TypeDefinition::Decimal64(_)          => "decimal64",
        TypeDefinition::String(_)             => "string",
        TypeDefinition::Binary(_)             => "binary",
        TypeDefinition::Bits(_)               => "bits",
        TypeDefinition::Enumeration(_)        => "enumeration",
        TypeDefinition::Identityref(_)        => "identityref",
        TypeDefinition::InstanceIdentifier(_) => "instance-identifier",
        TypeDefinition::Union(_)              => "union",
        TypeDefinition::Leafref(_)            => "leafref",
    }
}

fn print_schema(out: &mut impl Write, context: &SchemaContext, nodes: &[NodeId], depth: usize) -> io::Result<()> {
    for &id in nodes {
        let node = context.node(id);
        let name = match context.module_by_namespace(node.qname().namespace()) {
            Some(module) if depth == 0 => format!("{}:{}", module.name, node.qname().local_name()),
            _ => node.qname().local_name().to_owned(),
        };
        let detail = match node.kind() {
            SchemaNodeKind::Container { presence: true } => "container (presence)".to_owned(),
            SchemaNodeKind::Container { .. } => "container".to_owned(),
            SchemaNodeKind::List { keys, .. } => {
                let keys: Vec<&str> = keys.iter().map(|k| k.local_name()).collect();
                format!("list [{}]", keys.join(" "))
            }
            SchemaNodeKind::Leaf { type_def } => format!("leaf {}", type_name(type_def)),
            SchemaNodeKind::LeafList { type_def, .. } => format!("leaf-list {}", type_name(type_def)),
            SchemaNodeKind::Choice => "choice".to_owned(),
            SchemaNodeKind::Case => "case".to_owned(),
            SchemaNodeKind::Anydata => "anydata".to_owned(),
            SchemaNodeKind::Anyxml => "anyxml".to_owned(),
        };
        match node.mount_point() {
            Some(label) => writeln!(out, "{}+-- {} {} (mount point {})", "  ".repeat(depth), name, detail, label)?,
            None => writeln!(out, "{}+-- {} {}", "  ".repeat(depth), name, detail)?,
        }
        print_schema(out, context, node.children(), depth + 1)?;
    }
    Ok(())
}

fn main() -> Result<(), CodecError> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Commands::Normalize { codec, input, output, pretty } => {
            let (context, mut options, result) = decode(codec, input)?;
            options.pretty |= *pretty;
            let mut text = to_json_string(&context, &result, &options)?;
            text.push('\n');
            if let Some(out_path) = output {
                fs::write(out_path, &text)?;
                println!("{}", normalized_message(input, out_path));
            } else {
                io::stdout().write_all(text.as_bytes())?;
            }
            Ok(())
        }

        Commands::Check { codec, input } => {
            let (_context, _options, result) = decode(codec, input)?;
            println!("{}: ok ({} nodes)", input.display(), count_nodes(&result.data));
            Ok(())
        }

        Commands::Schema { schema } => {
            let context = load_schema(schema)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for module in context.modules() {
                writeln!(out, "module {} ({}, prefix {})", module.name, module.namespace, module.prefix)?;
            }
            print_schema(&mut out, &context, context.roots(), 0)?;
            Ok(())
        }
    }
}
