use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{LevelFilter, info, warn};
use simplelog::{Config, WriteLogger};

use pel::{
    BatchReport, ComponentNames, FilterConfig, Lookup, MessageRegistry, ParserSettings, PelParser,
    PelRecord,
};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const DEFAULT_PELS_PATH: &str = "/var/lib/phosphor-logging/extensions/pels/logs/";

enum Mode {
    /// Decode a single file and print it.
    File(PathBuf),
    /// Decode every file of `input`, writing one JSON file per PEL into `output`.
    Directory { input: PathBuf, output: PathBuf },
    Find(Lookup),
    List,
    Count,
}

struct PelDump {
    parser_settings: ParserSettings,
    mode: Mode,
    pels_path: PathBuf,
    extension: Option<String>,
    reverse: bool,
    registry: Option<PathBuf>,
    component_ids_dir: Option<PathBuf>,
    verbosity_level: Option<LevelFilter>,
}

fn parse_hex_u32(value: &str) -> Result<u32> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u32::from_str_radix(digits, 16).with_context(|| format!("`{}` is not a hex number", value))
}

fn read_src_exclusions(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read SRC exclusion file `{}`", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

impl PelDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let severities = matches
            .get_many::<String>("severity")
            .unwrap_or_default()
            .map(|value| {
                let value = parse_hex_u32(value)?;
                u8::try_from(value).with_context(|| format!("0x{:X} is not a severity", value))
            })
            .collect::<Result<Vec<u8>>>()?;

        let excluded_srcs = match matches.get_one::<PathBuf>("src-exclude-file") {
            Some(path) => read_src_exclusions(path)?,
            None => Vec::new(),
        };

        let filter = FilterConfig::new()
            .every_pel(matches.get_flag("all"))
            .serviceable(matches.get_flag("serviceable"))
            .non_serviceable(matches.get_flag("non-serviceable"))
            .hidden(matches.get_flag("hidden"))
            .crit_sys_term(matches.get_flag("termination"))
            .severities(severities)
            .only(matches.get_flag("only"))
            .excluded_srcs(excluded_srcs);

        let lookup = if let Some(id) = matches.get_one::<String>("id") {
            Some(Lookup::EntryId(parse_hex_u32(id)?))
        } else if let Some(id) = matches.get_one::<String>("plid") {
            Some(Lookup::PlatformLogId(parse_hex_u32(id)?))
        } else if let Some(id) = matches.get_one::<u32>("bmc-id") {
            Some(Lookup::BmcId(*id))
        } else {
            matches
                .get_one::<String>("src")
                .map(|src| Lookup::Src(src.to_ascii_uppercase()))
        };

        let mode = if let Some(input) = matches.get_one::<PathBuf>("directory") {
            let output = matches
                .get_one::<PathBuf>("output-dir")
                .unwrap_or(input)
                .clone();
            Mode::Directory {
                input: input.clone(),
                output,
            }
        } else if let Some(lookup) = lookup {
            Mode::Find(lookup)
        } else if matches.get_flag("list") {
            Mode::List
        } else if matches.get_flag("count") {
            Mode::Count
        } else if let Some(file) = matches.get_one::<PathBuf>("file") {
            Mode::File(file.clone())
        } else {
            bail!("Nothing to do, pass one of -f, -d, -l, -n or a PEL id to look up");
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(LevelFilter::Info),
            2 => Some(LevelFilter::Debug),
            3 => Some(LevelFilter::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(LevelFilter::Trace)
            }
        };

        Ok(PelDump {
            parser_settings: ParserSettings::new()
                .num_threads(0)
                .allow_plugins(!matches.get_flag("no-plugins"))
                .indent(!matches.get_flag("no-indent"))
                .filter(filter),
            mode,
            pels_path: matches
                .get_one::<PathBuf>("path")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PELS_PATH)),
            extension: matches.get_one::<String>("extension").cloned(),
            reverse: matches.get_flag("reverse"),
            registry: matches.get_one::<PathBuf>("registry").cloned(),
            component_ids_dir: matches.get_one::<PathBuf>("comp-id-dir").cloned(),
            verbosity_level,
        })
    }

    fn parser(&self) -> Result<PelParser> {
        let mut parser = PelParser::new(self.parser_settings.clone());

        if let Some(path) = &self.registry {
            parser = parser.with_message_registry(MessageRegistry::from_path(path)?);
        }
        if let Some(dir) = &self.component_ids_dir {
            parser = parser.with_component_names(ComponentNames::from_dir(dir));
        }
        Ok(parser)
    }

    /// Main entry point for `PelDump`
    pub fn run(&self) -> Result<()> {
        self.try_to_initialize_logging();
        let parser = self.parser()?;

        match &self.mode {
            Mode::File(path) => self.dump_file(&parser, path),
            Mode::Directory { input, output } => self.dump_directory(&parser, input, output),
            Mode::Find(lookup) => {
                let inputs = self.read_inputs(&self.pels_path)?;
                match parser.find(&inputs, lookup) {
                    Some(record) => self.print_record(&record),
                    None => bail!("PEL not found"),
                }
            }
            Mode::List => {
                let inputs = self.read_inputs(&self.pels_path)?;
                let report = parser.summarize_batch(&inputs);
                Self::report_failures(&inputs, &report);

                let mut listing = serde_json::Map::new();
                for (_, summary) in report.outputs {
                    listing.insert(
                        format!("0x{:08X}", summary.entry_id),
                        serde_json::to_value(&summary)?,
                    );
                }
                self.print_json(&serde_json::Value::Object(listing))
            }
            Mode::Count => {
                let inputs = self.read_inputs(&self.pels_path)?;
                let report = parser.count(&inputs);
                Self::report_failures(&inputs, &report);
                self.print_json(&serde_json::json!({ "Number of PELs found": report.outputs.len() }))
            }
        }
    }

    fn dump_file(&self, parser: &PelParser, path: &Path) -> Result<()> {
        let data =
            fs::read(path).with_context(|| format!("Failed to read `{}`", path.display()))?;

        match parser
            .decode_direct(&data)
            .with_context(|| format!("Failed to decode `{}`", path.display()))?
        {
            Some(record) => self.print_record(&record),
            None => {
                eprintln!("No PEL parsed for {}", path.display());
                Ok(())
            }
        }
    }

    fn dump_directory(&self, parser: &PelParser, input: &Path, output: &Path) -> Result<()> {
        if !input.is_dir() {
            bail!("{} is not a valid directory", input.display());
        }
        if !output.is_dir() {
            bail!("Output directory {} doesn't exist", output.display());
        }

        let inputs = self.read_inputs(input)?;
        let report = parser.decode_batch(&inputs);

        for (index, record) in &report.outputs {
            let name = &inputs[*index].0;
            let target = output.join(format!(
                "{}.0x{:08X}.json",
                name, record.private_header.platform_log_id
            ));
            let mut file = Self::create_output_file(&target)?;
            writeln!(
                file,
                "{}",
                record.to_json_string(self.parser_settings.should_indent())?
            )?;
            info!("Wrote {}", target.display());
        }

        Self::report_failures(&inputs, &report);
        Ok(())
    }

    fn report_failures<T>(inputs: &[(String, Vec<u8>)], report: &BatchReport<T>) {
        for failure in &report.failures {
            eprintln!("No PEL parsed for {}: {}", inputs[failure.index].0, failure.error);
        }
    }

    /// Read every file at the top level of `dir`, sorted by name.
    fn read_inputs(&self, dir: &Path) -> Result<Vec<(String, Vec<u8>)>> {
        if !dir.is_dir() {
            bail!(
                "{} is not a valid directory, use -p to specify the path to the PELs",
                dir.display()
            );
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("Failed to read `{}`", dir.display()))? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(wanted) = &self.extension {
                let wanted = wanted.trim_start_matches('.');
                if path.extension().and_then(|e| e.to_str()) != Some(wanted) {
                    continue;
                }
            }
            paths.push(path);
        }

        paths.sort();
        if self.reverse {
            paths.reverse();
        }

        let mut inputs = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match fs::read(&path) {
                Ok(data) => inputs.push((name, data)),
                Err(e) => warn!("Failed to read `{}`: {}", path.display(), e),
            }
        }
        Ok(inputs)
    }

    fn create_output_file(path: &Path) -> Result<File> {
        if path.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                path.display()
            );
        }
        File::create(path).with_context(|| format!("Failed to create `{}`", path.display()))
    }

    fn print_record(&self, record: &PelRecord) -> Result<()> {
        let text = record.to_json_string(self.parser_settings.should_indent())?;
        writeln!(io::stdout().lock(), "{}", text)?;
        Ok(())
    }

    fn print_json(&self, value: &serde_json::Value) -> Result<()> {
        let text = if self.parser_settings.should_indent() {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        writeln!(io::stdout().lock(), "{}", text)?;
        Ok(())
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = WriteLogger::init(level, Config::default(), io::stderr()) {
                eprintln!("Failed to initialize logging: {}", e);
            }
        }
    }
}

fn command() -> Command {
    Command::new("pel_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to decode Platform Event Log (PEL) files")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Input PEL file to decode."),
        )
        .arg(
            Arg::new("directory")
                .short('d')
                .long("directory")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Decode every file in a directory and save each as <filename>.<PLID>.json. Use -o to choose the output directory."),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Directory to write output files to when decoding a directory."),
        )
        .arg(
            Arg::new("extension")
                .short('e')
                .long("extension")
                .value_name("EXT")
                .help("Only look at files with this extension (e.g. \".pel\")."),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .action(ArgAction::SetTrue)
                .help("List PELs."),
        )
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .action(ArgAction::SetTrue)
                .help("Print the number of PELs that would be listed."),
        )
        .arg(
            Arg::new("all")
                .short('a')
                .long("all")
                .action(ArgAction::SetTrue)
                .help("Include every PEL, whatever its severity and flags."),
        )
        .arg(
            Arg::new("serviceable")
                .short('s')
                .long("serviceable")
                .action(ArgAction::SetTrue)
                .help("Include serviceable (not informational or recovered) PELs."),
        )
        .arg(
            Arg::new("non-serviceable")
                .short('N')
                .long("non-serviceable")
                .action(ArgAction::SetTrue)
                .help("Include non-serviceable (informational or recovered) PELs."),
        )
        .arg(
            Arg::new("hidden")
                .short('H')
                .long("hidden")
                .action(ArgAction::SetTrue)
                .help("Include hidden PELs."),
        )
        .arg(
            Arg::new("termination")
                .short('t')
                .long("termination")
                .action(ArgAction::SetTrue)
                .help("Include critical system terminating PELs."),
        )
        .arg(
            Arg::new("severity")
                .long("severity")
                .value_name("HEX")
                .action(ArgAction::Append)
                .help("Include PELs of this severity group, e.g. 0x40. Can be passed multiple times."),
        )
        .arg(
            Arg::new("only")
                .long("only")
                .action(ArgAction::SetTrue)
                .help("Restrict output to the requested categories."),
        )
        .arg(
            Arg::new("id")
                .short('i')
                .long("id")
                .value_name("HEX")
                .help("Display the PEL with this entry id."),
        )
        .arg(
            Arg::new("bmc-id")
                .long("bmc-id")
                .value_name("ID")
                .value_parser(clap::value_parser!(u32))
                .help("Display the PEL with this BMC event log id."),
        )
        .arg(
            Arg::new("plid")
                .long("plid")
                .value_name("HEX")
                .help("Display the PEL with this platform log id."),
        )
        .arg(
            Arg::new("src")
                .long("src")
                .value_name("SRC")
                .help("Display the first PEL with this primary SRC."),
        )
        .arg(
            Arg::new("src-exclude-file")
                .long("src-exclude-file")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("File of SRCs, one per line, to leave out of listings."),
        )
        .arg(
            Arg::new("no-plugins")
                .short('P')
                .long("no-plugins")
                .action(ArgAction::SetTrue)
                .help("Do not use plugins, user data is hex dumped."),
        )
        .arg(
            Arg::new("reverse")
                .short('r')
                .long("reverse")
                .action(ArgAction::SetTrue)
                .help("Process PELs in reverse order."),
        )
        .arg(
            Arg::new("registry")
                .long("registry")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Message registry JSON used to explain BMC SRCs."),
        )
        .arg(
            Arg::new("comp-id-dir")
                .long("comp-id-dir")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Directory with <creator>_component_ids.json name tables."),
        )
        .arg(
            Arg::new("no-indent")
                .long("no-indent")
                .action(ArgAction::SetTrue)
                .help("When set, output will not be indented."),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help(format!("Path to the PELs, defaults to {}", DEFAULT_PELS_PATH)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace"),
        )
}

fn main() -> Result<()> {
    let matches = command().get_matches();
    let app = PelDump::from_cli_matches(&matches)?;
    app.run()
}
