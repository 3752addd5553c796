use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use zonekeeper::gslb::{GslbBackend, GslbMode, HealthcheckRef};
use zonekeeper::zone::{Record, RecordType};
use zonekeeper::{Config, CorefileManager, GslbManager, HostsManager, ZoneManager, unified_diff};

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage CoreDNS zone, hosts, GSLB and Corefile artifacts", long_about = None)]
struct Cli {
    /// TOML config file (defaults to COREFILE_PATH/ZONE_DIR/... from the environment)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Zone files (db.<domain>)
    #[command(subcommand)]
    Zone(ZoneCommand),
    /// Hosts files
    #[command(subcommand)]
    Hosts(HostsCommand),
    /// GSLB configs (db.<domain>.yml)
    #[command(subcommand)]
    Gslb(GslbCommand),
    /// The Corefile
    #[command(subcommand)]
    Corefile(CorefileCommand),
    /// Unified diff of two files
    Diff {
        original: PathBuf,
        modified: PathBuf,
        /// Label used in the diff headers
        #[arg(long)]
        label: Option<String>,
    },
}

#[derive(Args, Debug)]
struct Input {
    /// File to read content from, `-` for stdin
    #[arg(short, long, default_value = "-")]
    file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum ZoneCommand {
    List,
    /// Parsed records and SOA as JSON
    Show { domain: String },
    Raw { domain: String },
    Create { domain: String },
    Delete { domain: String },
    Validate {
        domain: String,
        #[command(flatten)]
        input: Input,
    },
    /// Validate and write new content
    Save {
        domain: String,
        #[command(flatten)]
        input: Input,
    },
    /// Show what saving new content would change
    Diff {
        domain: String,
        #[command(flatten)]
        input: Input,
    },
    Add {
        domain: String,
        name: String,
        #[arg(value_name = "TYPE")]
        rtype: RecordType,
        value: String,
        #[arg(long, default_value_t = 0)]
        ttl: u32,
        /// MX preference
        #[arg(long, default_value_t = 0)]
        priority: u16,
    },
    Remove {
        domain: String,
        name: String,
        #[arg(value_name = "TYPE")]
        rtype: RecordType,
        value: String,
    },
}

#[derive(Subcommand, Debug)]
enum HostsCommand {
    List,
    Show { domain: String },
    Raw { domain: String },
    Create { domain: String },
    Delete { domain: String },
    Write {
        domain: String,
        #[command(flatten)]
        input: Input,
    },
    Add {
        domain: String,
        ip: String,
        hostname: String,
    },
    Remove {
        domain: String,
        ip: String,
        hostname: String,
    },
}

#[derive(Subcommand, Debug)]
enum GslbCommand {
    List,
    Show { domain: String },
    Raw { domain: String },
    Create { domain: String },
    Delete { domain: String },
    Validate {
        #[command(flatten)]
        input: Input,
    },
    /// Validate and write raw YAML
    Write {
        domain: String,
        #[command(flatten)]
        input: Input,
    },
    AddRecord {
        domain: String,
        name: String,
        #[arg(long, default_value = "failover")]
        mode: GslbMode,
        #[arg(long, default_value_t = 30)]
        ttl: i64,
        #[arg(long, default_value = "10s")]
        scrape_interval: String,
    },
    UpdateRecord {
        domain: String,
        name: String,
        #[arg(long)]
        mode: GslbMode,
        #[arg(long)]
        ttl: i64,
        #[arg(long)]
        scrape_interval: String,
    },
    RemoveRecord { domain: String, name: String },
    AddBackend {
        domain: String,
        record: String,
        address: String,
        #[arg(long, default_value_t = 0)]
        priority: i64,
        #[arg(long, default_value_t = 0)]
        weight: i64,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long)]
        disabled: bool,
        /// Health check profile name, may be repeated
        #[arg(long = "healthcheck")]
        healthchecks: Vec<String>,
    },
    /// Remove a backend by zero-based position
    RemoveBackend {
        domain: String,
        record: String,
        index: usize,
    },
}

#[derive(Subcommand, Debug)]
enum CorefileCommand {
    Show,
    Validate {
        #[command(flatten)]
        input: Input,
    },
    /// Validate and write new content
    Save {
        #[command(flatten)]
        input: Input,
    },
    Diff {
        #[command(flatten)]
        input: Input,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zonekeeper=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::Diff {
        original,
        modified,
        label,
    } = &cli.command
    {
        let label = label
            .clone()
            .unwrap_or_else(|| original.display().to_string());
        print!(
            "{}",
            unified_diff(&label, &read_input(original)?, &read_input(modified)?)
        );
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Command::Zone(cmd) => run_zone(&ZoneManager::from_config(&config), cmd),
        Command::Hosts(cmd) => run_hosts(&HostsManager::from_config(&config), cmd),
        Command::Gslb(cmd) => run_gslb(&GslbManager::from_config(&config), cmd),
        Command::Corefile(cmd) => run_corefile(&CorefileManager::from_config(&config), cmd),
        Command::Diff { .. } => Ok(()),
    }
}

fn run_zone(manager: &ZoneManager, cmd: ZoneCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ZoneCommand::List => print_json(&manager.list()?)?,
        ZoneCommand::Show { domain } => print_json(&manager.read(&domain)?)?,
        ZoneCommand::Raw { domain } => print!("{}", manager.read_raw(&domain)?),
        ZoneCommand::Create { domain } => manager.create(&domain)?,
        ZoneCommand::Delete { domain } => manager.delete(&domain)?,
        ZoneCommand::Validate { domain, input } => {
            manager.validate(&domain, &read_input(&input.file)?)?;
            println!("ok");
        }
        ZoneCommand::Save { domain, input } => manager.save(&domain, &read_input(&input.file)?)?,
        ZoneCommand::Diff { domain, input } => {
            print!("{}", manager.preview(&domain, &read_input(&input.file)?)?)
        }
        ZoneCommand::Add {
            domain,
            name,
            rtype,
            value,
            ttl,
            priority,
        } => {
            let record = Record::new(name, rtype, value)
                .with_ttl(ttl)
                .with_priority(priority);
            manager.add_record(&domain, &record)?;
        }
        ZoneCommand::Remove {
            domain,
            name,
            rtype,
            value,
        } => manager.remove_record(&domain, &name, rtype, &value)?,
    }
    Ok(())
}

fn run_hosts(manager: &HostsManager, cmd: HostsCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        HostsCommand::List => print_json(&manager.list()?)?,
        HostsCommand::Show { domain } => print_json(&manager.read(&domain)?)?,
        HostsCommand::Raw { domain } => print!("{}", manager.read_raw(&domain)?),
        HostsCommand::Create { domain } => manager.create(&domain)?,
        HostsCommand::Delete { domain } => manager.delete(&domain)?,
        HostsCommand::Write { domain, input } => {
            manager.write(&domain, &read_input(&input.file)?)?
        }
        HostsCommand::Add {
            domain,
            ip,
            hostname,
        } => manager.add_entry(&domain, &ip, &hostname)?,
        HostsCommand::Remove {
            domain,
            ip,
            hostname,
        } => manager.remove_entry(&domain, &ip, &hostname)?,
    }
    Ok(())
}

fn run_gslb(manager: &GslbManager, cmd: GslbCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        GslbCommand::List => print_json(&manager.list()?)?,
        GslbCommand::Show { domain } => print_json(&manager.read(&domain)?)?,
        GslbCommand::Raw { domain } => print!("{}", manager.read_raw(&domain)?),
        GslbCommand::Create { domain } => manager.create(&domain)?,
        GslbCommand::Delete { domain } => manager.delete(&domain)?,
        GslbCommand::Validate { input } => {
            manager.validate_raw(&read_input(&input.file)?)?;
            println!("ok");
        }
        GslbCommand::Write { domain, input } => {
            manager.write_raw(&domain, &read_input(&input.file)?)?
        }
        GslbCommand::AddRecord {
            domain,
            name,
            mode,
            ttl,
            scrape_interval,
        } => manager.add_record(&domain, &name, mode, ttl, &scrape_interval)?,
        GslbCommand::UpdateRecord {
            domain,
            name,
            mode,
            ttl,
            scrape_interval,
        } => manager.update_record(&domain, &name, mode, ttl, &scrape_interval)?,
        GslbCommand::RemoveRecord { domain, name } => manager.remove_record(&domain, &name)?,
        GslbCommand::AddBackend {
            domain,
            record,
            address,
            priority,
            weight,
            location,
            disabled,
            healthchecks,
        } => {
            let backend = GslbBackend {
                priority,
                weight,
                location,
                disabled,
                healthchecks: healthchecks
                    .into_iter()
                    .map(HealthcheckRef::Named)
                    .collect(),
                ..GslbBackend::new(address)
            };
            manager.add_backend(&domain, &record, backend)?;
        }
        GslbCommand::RemoveBackend {
            domain,
            record,
            index,
        } => manager.remove_backend(&domain, &record, index)?,
    }
    Ok(())
}

fn run_corefile(
    manager: &CorefileManager,
    cmd: CorefileCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        CorefileCommand::Show => print!("{}", manager.read()?),
        CorefileCommand::Validate { input } => {
            manager.validate(&read_input(&input.file)?)?;
            println!("ok");
        }
        CorefileCommand::Save { input } => manager.save(&read_input(&input.file)?)?,
        CorefileCommand::Diff { input } => print!("{}", manager.preview(&read_input(&input.file)?)?),
    }
    Ok(())
}

fn read_input(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        std::fs::read_to_string(path)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
