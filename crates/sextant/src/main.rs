use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use sextant_core::dwarf::load_module;
use sextant_core::symbols::{CompileUnit, MacroEntry, Module, RealpathPrefixes, ResolveScope, SymbolContext, SymbolContextList};
use sextant_core::types::SourceLocationSpec;
use sextant_core::{Address, FileSpec, SextantError, SextantResult};
use sextant_utils::{info, init_logging};

/// A symbol-layer inspector for native binaries: compile units, line tables, and source-location lookup.
#[derive(Parser, Debug)]
#[command(name = "sextant")]
#[command(version)]
#[command(about = "Inspect the debug info of native binaries", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List the compile units of an image
    Units
    {
        /// Path to the image (ELF or Mach-O)
        image: String,
    },
    /// List the functions of a compile unit (or all units)
    Functions
    {
        /// Path to the image (ELF or Mach-O)
        image: String,
        /// Restrict to the compile unit at this index
        #[arg(short, long)]
        unit: Option<usize>,
    },
    /// Dump line tables
    LineTable
    {
        /// Path to the image (ELF or Mach-O)
        image: String,
        /// Restrict to the compile unit at this index
        #[arg(short, long)]
        unit: Option<usize>,
    },
    /// Dump preprocessor macro information
    Macros
    {
        /// Path to the image (ELF or Mach-O)
        image: String,
        /// Restrict to the compile unit at this index
        #[arg(short, long)]
        unit: Option<usize>,
    },
    /// List unit-scope variables
    Variables
    {
        /// Path to the image (ELF or Mach-O)
        image: String,
        /// Restrict to the compile unit at this index
        #[arg(short, long)]
        unit: Option<usize>,
    },
    /// Resolve an address or a source position to symbol contexts
    Lookup
    {
        /// Path to the image (ELF or Mach-O)
        image: String,
        /// File address to resolve (hex format: 0x1000 or decimal)
        #[arg(short, long)]
        address: Option<String>,
        /// Source file to resolve (basename or full path)
        #[arg(short, long)]
        file: Option<String>,
        /// Source line to resolve
        #[arg(short, long)]
        line: Option<u32>,
        /// Source column to resolve
        #[arg(short, long)]
        column: Option<u16>,
        /// Also search files that appear in a unit only through inlining
        #[arg(long, default_value_t = false)]
        check_inlines: bool,
        /// Reject nearest-line fallback; the position must exist exactly
        #[arg(long, default_value_t = false)]
        exact: bool,
        /// Only resolve line entries, skipping function/block/symbol lookup
        #[arg(long, default_value_t = false)]
        line_entry_only: bool,
        /// Canonicalize support files under this prefix before comparing
        /// (repeatable; useful for symlinked build trees)
        #[arg(long)]
        realpath_prefix: Vec<PathBuf>,
    },
}

fn main()
{
    // Initialize logging (reads from RUST_LOG env var)
    // Defaults to INFO level and Pretty format if not set
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let cli = Cli::parse();

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> SextantResult<()>
{
    match cli.command {
        Commands::Units { image } => {
            let module = load_module(&image)?;
            println!("Compile units in {}:", module.file());
            for (idx, unit) in module.compile_units().iter().enumerate() {
                let mut unit = unit.lock().unwrap();
                let language = unit.language();
                let optimized = unit.is_optimized();
                println!(
                    "  [{idx}] {:#010x} {} language={} optimized={}",
                    unit.id().raw(),
                    unit.primary_file(),
                    language,
                    optimized
                );
            }
            Ok(())
        }
        Commands::Functions { image, unit } => {
            let module = load_module(&image)?;
            for unit in selected_units(&module, unit)? {
                let mut unit = unit.lock().unwrap();
                // A predicate that never matches forces the full parse.
                unit.find_function(|_| false);
                println!("{} ({} functions):", unit.primary_file(), unit.num_functions());
                unit.for_each_function(|function| {
                    println!("  {} {}", function.range(), function.display_name());
                    false
                });
            }
            Ok(())
        }
        Commands::LineTable { image, unit } => {
            let module = load_module(&image)?;
            for unit in selected_units(&module, unit)? {
                let mut unit = unit.lock().unwrap();
                let rows = unit.line_table().map(|table| table.entries().to_vec()).unwrap_or_default();
                if rows.is_empty() {
                    println!("{}: no line table", unit.primary_file());
                    continue;
                }
                println!("Line table for {}:", unit.primary_file());
                for row in rows {
                    let mut flags = String::new();
                    if row.is_start_of_statement {
                        flags.push_str(" stmt");
                    }
                    if row.is_prologue_end {
                        flags.push_str(" prologue-end");
                    }
                    match unit.support_files().get(row.file_index as usize) {
                        Some(file) => println!("  {} {}:{}:{}{}", row.range, file, row.line, row.column, flags),
                        None => println!("  {} <file {}>:{}:{}{}", row.range, row.file_index, row.line, row.column, flags),
                    }
                }
            }
            Ok(())
        }
        Commands::Macros { image, unit } => {
            let module = load_module(&image)?;
            for unit in selected_units(&module, unit)? {
                let mut unit = unit.lock().unwrap();
                match unit.debug_macros() {
                    Some(macros) => {
                        println!("Macros for {}:", unit.primary_file());
                        print_macro_entries(macros.entries(), 0);
                    }
                    None => println!("{}: no macro information", unit.primary_file()),
                }
            }
            Ok(())
        }
        Commands::Variables { image, unit } => {
            let module = load_module(&image)?;
            for unit in selected_units(&module, unit)? {
                let mut unit = unit.lock().unwrap();
                let variables = unit.variables().filter(|list| !list.is_empty());
                match variables {
                    Some(list) => {
                        println!("Unit-scope variables for {}:", unit.primary_file());
                        for variable in list.variables() {
                            let type_name = variable.type_name.as_deref().unwrap_or("<unknown type>");
                            match &variable.declaration {
                                Some(declaration) => println!("  {}: {} ({})", variable.name, type_name, declaration),
                                None => println!("  {}: {}", variable.name, type_name),
                            }
                        }
                    }
                    None => println!("{}: no unit-scope variables", unit.primary_file()),
                }
            }
            Ok(())
        }
        Commands::Lookup {
            image,
            address,
            file,
            line,
            column,
            check_inlines,
            exact,
            line_entry_only,
            realpath_prefix,
        } => {
            let module = load_module(&image)?;
            let scope = if line_entry_only {
                ResolveScope::LINE_ENTRY
            } else {
                ResolveScope::EVERYTHING
            };

            if let Some(address) = address {
                if file.is_some() || line.is_some() {
                    return Err(SextantError::InvalidArgument(
                        "--address and --file/--line are mutually exclusive".to_string(),
                    ));
                }
                let address = parse_address(&address)?;
                info!("Looking up address {address} in {image}");
                let mut context = SymbolContext::new();
                if module.resolve_symbol_context_for_address(address, scope, &mut context) {
                    print_context(&module, 0, &context);
                } else {
                    println!("No compile unit claims address {address}");
                }
                return Ok(());
            }

            let Some(file) = file else {
                return Err(SextantError::InvalidArgument(
                    "lookup needs --address, or --file (with an optional --line)".to_string(),
                ));
            };
            let location = SourceLocationSpec::new(FileSpec::from_path(&file), line, column, check_inlines, exact);
            info!("Looking up {location} in {image}");

            let prefixes = if realpath_prefix.is_empty() {
                None
            } else {
                Some(RealpathPrefixes::new(realpath_prefix))
            };

            let mut results = SymbolContextList::new();
            module.resolve_symbol_contexts_for_location(&location, scope, &mut results, prefixes.as_ref());
            if results.is_empty() {
                println!("No matches for {location}");
            } else {
                println!("{} match(es) for {location}:", results.len());
                for (idx, context) in results.iter().enumerate() {
                    print_context(&module, idx, context);
                }
            }
            Ok(())
        }
    }
}

/// The units a `--unit` selector names: one by index, or all of them.
fn selected_units(module: &Arc<Module>, unit: Option<usize>) -> SextantResult<Vec<Arc<Mutex<CompileUnit>>>>
{
    match unit {
        Some(idx) => module.compile_unit_at_index(idx).map(|unit| vec![unit]).ok_or_else(|| {
            SextantError::InvalidArgument(format!(
                "no compile unit at index {idx} (module has {})",
                module.num_compile_units()
            ))
        }),
        None => Ok(module.compile_units()),
    }
}

fn parse_address(text: &str) -> SextantResult<Address>
{
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        text.parse::<u64>()
    };
    match parsed {
        Ok(value) => Ok(Address::new(value)),
        Err(_) => Err(SextantError::InvalidArgument(format!("invalid address: {text}"))),
    }
}

fn print_macro_entries(entries: &[MacroEntry], depth: usize)
{
    let indent = "  ".repeat(depth + 1);
    for entry in entries {
        match entry {
            MacroEntry::Define { text } => println!("{indent}#define {text}"),
            MacroEntry::Undefine { text } => println!("{indent}#undef {text}"),
            MacroEntry::StartFile { file_index, line } => {
                println!("{indent}start file {file_index} (included at line {line})");
            }
            MacroEntry::EndFile => println!("{indent}end file"),
            MacroEntry::Include(shared) => {
                println!("{indent}import shared table ({} entries)", shared.len());
                print_macro_entries(shared.entries(), depth + 1);
            }
        }
    }
}

fn print_context(module: &Arc<Module>, idx: usize, context: &SymbolContext)
{
    println!("\nResult {idx}:");
    if let Some(id) = context.compile_unit {
        match module.compile_unit_by_id(id) {
            Some(unit) => println!("  compile unit: {} ({:#010x})", unit.lock().unwrap().primary_file(), id.raw()),
            None => println!("  compile unit: {:#010x}", id.raw()),
        }
    }
    if let Some(function) = &context.function {
        println!("  function: {} {}", function.display_name(), function.range());
    }
    if let Some(block) = context.block {
        println!("  block: {}", block.raw());
    }
    if let Some(entry) = context.line_entry {
        let file = context
            .compile_unit
            .and_then(|id| module.compile_unit_by_id(id))
            .and_then(|unit| unit.lock().unwrap().support_files().get(entry.file_index as usize).cloned());
        match file {
            Some(file) => println!("  line entry: {}:{}:{} {}", file, entry.line, entry.column, entry.range),
            None => println!("  line entry: <file {}>:{}:{} {}", entry.file_index, entry.line, entry.column, entry.range),
        }
    }
    if let Some(symbol) = &context.symbol {
        println!("  symbol: {} {}", symbol.name().display_name(), symbol.range());
    }
}
