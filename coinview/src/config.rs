use clap::{Arg, ArgAction, ArgMatches, Command};
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use bitcoin::Network;

use crate::error::FrontendError;
use crate::rpc::RpcConfig;

const DEFAULT_RPC_PORT: u16 = 8332;
const DEFAULT_TESTNET_RPC_PORT: u16 = 18332;
const DEFAULT_WALLET_FILE: &str = "wallet.sqlite3";
const SETTINGS_FILE: &str = "coinview.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub network: Network,
    pub data_dir: PathBuf,
    pub pid_file: Option<PathBuf>,
    pub listen: bool,
    pub add_nodes: Vec<String>,
    pub connect_nodes: Vec<String>,
    pub rpc: RpcConfig,
    pub wallet: WalletConfig,
    pub generate: bool,
    pub lang: Option<String>,
    pub start_minimized: bool,

    /// RPC method followed by its parameters; empty to run the front-end
    pub rpc_params: Vec<String>,

    /// `bitcoin:` URIs passed on the command line
    pub urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Key pool is managed by the wallet engine; accepted and logged only
    pub keypool_size: Option<u16>,
    pub rescan: bool,
    pub file: PathBuf,
}

fn is_true(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn is_url(arg: &str) -> bool {
    arg.len() > 8
        && arg
            .get(..8)
            .map_or(false, |scheme| scheme.eq_ignore_ascii_case("bitcoin:"))
}

/// Command-line definition shared by the binary and tests
pub fn build_command() -> Command {
    Command::new("coinview")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Wallet front-end for a bitcoin node")
        .override_usage("coinview [options] [rpc-command param1 param2 ...]")
        .after_help(
            "If no rpc-command is specified, coinview starts the wallet front-end, \
             otherwise it offers command-line access to a running node",
        )
        .arg(
            Arg::new("conf")
                .short('c')
                .long("conf")
                .value_name("FILE")
                .help("Specify configuration file")
                .default_value("bitcoin.conf")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("datadir")
                .long("datadir")
                .value_name("DIR")
                .help("Specify non default data directory")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("pid")
                .long("pid")
                .value_name("FILE")
                .help("Specify pid file (default: bitcoind.pid)")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("nolisten")
                .long("nolisten")
                .help("Don't accept connections from outside")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("testnet")
                .long("testnet")
                .help("Use the test network")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("addnode")
                .long("addnode")
                .value_name("ADDR")
                .help("Add a node to connect to")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("connect")
                .long("connect")
                .value_name("ADDR")
                .help("Connect only to the specified node")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("rpcuser")
                .long("rpcuser")
                .value_name("USER")
                .help("Username for JSON-RPC connections")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("rpcpassword")
                .long("rpcpassword")
                .value_name("PASSWORD")
                .help("Password for JSON-RPC connections")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("rpcport")
                .long("rpcport")
                .value_name("PORT")
                .help("Send JSON-RPC commands to PORT (default: 8332, testnet: 18332)")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("rpcallowip")
                .long("rpcallowip")
                .value_name("IP")
                .help("Allow JSON-RPC connections from specified IP address (default: 127.0.0.1)")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("rpcconnect")
                .long("rpcconnect")
                .value_name("IP")
                .help("Send commands to node running on IP (default: 127.0.0.1)")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("keypool")
                .long("keypool")
                .value_name("N")
                .help("Set key pool size to N")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("rescan")
                .long("rescan")
                .help("Rescan the block chain for missing wallet transactions")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("gen")
                .long("gen")
                .help("Generate coins")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rpcssl")
                .long("rpcssl")
                .help("Use https for JSON-RPC connections")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rpcsslcertificatechainfile")
                .long("rpcsslcertificatechainfile")
                .value_name("FILE")
                .help("Server certificate file (default: server.cert)")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("rpcsslprivatekeyfile")
                .long("rpcsslprivatekeyfile")
                .value_name("FILE")
                .help("Server private key (default: server.pem)")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("lang")
                .long("lang")
                .value_name("LOCALE")
                .help("Specify locale, e.g. \"en_US\"")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("min")
                .long("min")
                .help("Start minimized")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("wallet")
                .long("wallet")
                .value_name("FILE")
                .help("Wallet database within the data directory (default: wallet.sqlite3)")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("params")
                .value_name("PARAMS")
                .help("Run JSON RPC command")
                .hide(true)
                .num_args(1..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .value_parser(clap::value_parser!(String)),
        )
}

impl Config {
    /// `~/.bitcoin`, or its `testnet3` subdirectory
    pub fn default_data_dir(network: Network) -> Result<PathBuf, FrontendError> {
        let home = dirs::home_dir()
            .ok_or_else(|| FrontendError::ConfigError("Failed to determine home directory".to_string()))?;
        Ok(match network {
            Network::Bitcoin => home.join(".bitcoin"),
            _ => home.join(".bitcoin").join("testnet3"),
        })
    }

    /// Resolve the data directory and configuration file, then load both
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, FrontendError> {
        let data_dir = match matches.get_one::<String>("datadir") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let network = if matches.get_flag("testnet") {
                    Network::Testnet
                } else {
                    Network::Bitcoin
                };
                Self::default_data_dir(network)?
            }
        };

        let conf = matches
            .get_one::<String>("conf")
            .map(String::as_str)
            .unwrap_or("bitcoin.conf");
        let conf_path = data_dir.join(conf);
        log::info!("Using configuration file {}", conf_path.display());

        let mut config = Self::load(&conf_path, matches)?;
        config.data_dir = data_dir;
        Ok(config)
    }

    fn defaults() -> Self {
        Config {
            network: Network::Bitcoin,
            data_dir: PathBuf::new(),
            pid_file: None,
            listen: true,
            add_nodes: Vec::new(),
            connect_nodes: Vec::new(),
            rpc: RpcConfig::default(),
            wallet: WalletConfig {
                keypool_size: None,
                rescan: false,
                file: PathBuf::from(DEFAULT_WALLET_FILE),
            },
            generate: false,
            lang: None,
            start_minimized: false,
            rpc_params: Vec::new(),
            urls: Vec::new(),
        }
    }

    /// Load configuration from a file and command line arguments, Bitcoin Core style.
    ///
    /// Command-line values win over the file.
    pub fn load(conf_path: &Path, matches: &ArgMatches) -> Result<Self, FrontendError> {
        let mut config = Self::defaults();
        let mut rpc_port = None;

        if conf_path.exists() {
            let file = fs::File::open(conf_path)
                .map_err(|e| FrontendError::ConfigError(format!("Failed to open config file: {}", e)))?;

            let reader = io::BufReader::new(file);
            let mut section = String::new();

            for line in reader.lines() {
                let line =
                    line.map_err(|e| FrontendError::ConfigError(format!("Failed to read line: {}", e)))?;
                let trimmed = line.trim();

                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }

                if trimmed.starts_with('[') && trimmed.ends_with(']') {
                    section = trimmed[1..trimmed.len() - 1].to_string();
                    continue;
                }

                if let Some((key, value)) = trimmed.split_once('=') {
                    config.apply_setting(&section, key.trim(), value.trim(), &mut rpc_port)?;
                }
            }
        } else {
            log::debug!("No configuration file at {}", conf_path.display());
        }

        config.apply_command_line_args(matches, &mut rpc_port);

        config.rpc.port = rpc_port.unwrap_or(match config.network {
            Network::Bitcoin => DEFAULT_RPC_PORT,
            _ => DEFAULT_TESTNET_RPC_PORT,
        });
        Ok(config)
    }

    fn apply_setting(
        &mut self,
        section: &str,
        key: &str,
        value: &str,
        rpc_port: &mut Option<u16>,
    ) -> Result<(), FrontendError> {
        match (section, key) {
            ("", "testnet") | ("test", "testnet") => {
                if is_true(value) {
                    self.network = Network::Testnet;
                }
            }
            ("", "pid") => self.pid_file = Some(PathBuf::from(value)),
            ("", "nolisten") => self.listen = !is_true(value),
            ("", "addnode") => self.add_nodes.push(value.to_string()),
            ("", "connect") => self.connect_nodes.push(value.to_string()),

            ("", "rpcuser") | ("rpc", "user") => self.rpc.auth.user = Some(value.to_string()),
            ("", "rpcpassword") | ("rpc", "password") => {
                self.rpc.auth.password = Some(value.to_string())
            }
            ("", "rpcport") | ("rpc", "port") => {
                let port = value
                    .parse::<u16>()
                    .map_err(|e| FrontendError::ConfigError(format!("Invalid rpcport {}: {}", value, e)))?;
                *rpc_port = Some(port);
            }
            ("", "rpcallowip") | ("rpc", "allowip") => self.rpc.allow_ips.push(value.to_string()),
            ("", "rpcconnect") | ("rpc", "connect") => self.rpc.connect = value.to_string(),
            ("", "rpcssl") | ("rpc", "ssl") => self.rpc.ssl = is_true(value),
            ("", "rpcsslcertificatechainfile") => self.rpc.cert_chain = PathBuf::from(value),
            ("", "rpcsslprivatekeyfile") => self.rpc.private_key = PathBuf::from(value),

            ("", "keypool") | ("wallet", "keypool") => {
                if let Ok(size) = value.parse::<u16>() {
                    self.wallet.keypool_size = Some(size);
                }
            }
            ("", "rescan") | ("wallet", "rescan") => self.wallet.rescan = is_true(value),
            ("", "wallet") | ("wallet", "file") => self.wallet.file = PathBuf::from(value),

            ("", "gen") => self.generate = is_true(value),
            ("", "lang") => self.lang = Some(value.to_string()),

            _ => {
                log::debug!("Ignoring unknown config option: [{}] {}", section, key);
            }
        }

        Ok(())
    }

    fn apply_command_line_args(&mut self, matches: &ArgMatches, rpc_port: &mut Option<u16>) {
        if matches.get_flag("testnet") {
            self.network = Network::Testnet;
        }
        if matches.get_flag("nolisten") {
            self.listen = false;
        }
        if let Some(pid) = matches.get_one::<String>("pid") {
            self.pid_file = Some(PathBuf::from(pid));
        }
        if let Some(nodes) = matches.get_many::<String>("addnode") {
            self.add_nodes.extend(nodes.cloned());
        }
        if let Some(nodes) = matches.get_many::<String>("connect") {
            self.connect_nodes.extend(nodes.cloned());
        }

        if let Some(user) = matches.get_one::<String>("rpcuser") {
            self.rpc.auth.user = Some(user.clone());
        }
        if let Some(password) = matches.get_one::<String>("rpcpassword") {
            self.rpc.auth.password = Some(password.clone());
        }
        if let Some(port) = matches.get_one::<u16>("rpcport") {
            *rpc_port = Some(*port);
        }
        if let Some(ips) = matches.get_many::<String>("rpcallowip") {
            self.rpc.allow_ips.extend(ips.cloned());
        }
        if let Some(connect) = matches.get_one::<String>("rpcconnect") {
            self.rpc.connect = connect.clone();
        }
        if matches.get_flag("rpcssl") {
            self.rpc.ssl = true;
        }
        if let Some(file) = matches.get_one::<String>("rpcsslcertificatechainfile") {
            self.rpc.cert_chain = PathBuf::from(file);
        }
        if let Some(file) = matches.get_one::<String>("rpcsslprivatekeyfile") {
            self.rpc.private_key = PathBuf::from(file);
        }

        if let Some(size) = matches.get_one::<u16>("keypool") {
            self.wallet.keypool_size = Some(*size);
        }
        if matches.get_flag("rescan") {
            self.wallet.rescan = true;
        }
        if let Some(file) = matches.get_one::<String>("wallet") {
            self.wallet.file = PathBuf::from(file);
        }
        if matches.get_flag("gen") {
            self.generate = true;
        }
        if let Some(lang) = matches.get_one::<String>("lang") {
            self.lang = Some(lang.clone());
        }
        if matches.get_flag("min") {
            self.start_minimized = true;
        }

        if let Some(params) = matches.get_many::<String>("params") {
            let (urls, params): (Vec<String>, Vec<String>) = params.cloned().partition(|p| is_url(p));
            self.urls = urls;
            self.rpc_params = params;
        }
    }

    /// RPC method and its parameters, when running as a command-line client
    pub fn rpc_command(&self) -> Option<(&str, &[String])> {
        let (method, params) = self.rpc_params.split_first()?;
        Some((method.as_str(), params))
    }

    pub fn wallet_path(&self) -> PathBuf {
        self.data_dir.join(&self.wallet.file)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(args: &[&str]) -> ArgMatches {
        build_command()
            .try_get_matches_from(std::iter::once("coinview").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("bitcoin.conf"), &matches(&[])).unwrap();

        assert_eq!(config.network, Network::Bitcoin);
        assert_eq!(config.rpc.url(), "http://127.0.0.1:8332");
        assert_eq!(config.rpc.cert_chain, PathBuf::from("server.cert"));
        assert!(config.listen);
        assert!(config.rpc_command().is_none());
    }

    #[test]
    fn testnet_changes_default_port() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            Config::load(&dir.path().join("bitcoin.conf"), &matches(&["--testnet"])).unwrap();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.rpc.port, 18332);
    }

    #[test]
    fn command_line_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("bitcoin.conf");
        fs::write(
            &conf,
            "# node settings\nrpcuser=alice\nrpcpassword=secret\nrpcport=9000\n\
             rpcconnect=10.0.0.2\naddnode=seed.example:8333\n[wallet]\nrescan=1\n",
        )
        .unwrap();

        let config = Config::load(&conf, &matches(&["--rpcport", "9100", "--addnode", "peer:8333"])).unwrap();
        assert_eq!(config.rpc.auth.credentials(), Some(("alice", "secret")));
        assert_eq!(config.rpc.port, 9100);
        assert_eq!(config.rpc.connect, "10.0.0.2");
        assert_eq!(config.add_nodes, vec!["seed.example:8333", "peer:8333"]);
        assert!(config.wallet.rescan);
    }

    #[test]
    fn node_only_options_are_still_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("bitcoin.conf");
        fs::write(&conf, "rpcallowip=10.0.0.0/8\nrpcsslprivatekeyfile=node.pem\nkeypool=50\n").unwrap();

        let config = Config::load(&conf, &matches(&["--rpcallowip", "192.168.0.1"])).unwrap();
        assert_eq!(config.rpc.allow_ips, vec!["127.0.0.1", "10.0.0.0/8", "192.168.0.1"]);
        assert_eq!(config.rpc.private_key, PathBuf::from("node.pem"));
        assert_eq!(config.wallet.keypool_size, Some(50));
        assert_eq!(config.rpc.url(), "http://127.0.0.1:8332");
    }

    #[test]
    fn bad_port_in_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("bitcoin.conf");
        fs::write(&conf, "rpcport=eighty\n").unwrap();

        assert!(matches!(
            Config::load(&conf, &matches(&[])),
            Err(FrontendError::ConfigError(_))
        ));
    }

    #[test]
    fn trailing_params_become_rpc_command() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(
            &dir.path().join("bitcoin.conf"),
            &matches(&["--rpcssl", "getblockhash", "-1", "extra"]),
        )
        .unwrap();

        let (method, params) = config.rpc_command().unwrap();
        assert_eq!(method, "getblockhash");
        assert_eq!(params, ["-1".to_string(), "extra".to_string()]);
        assert!(config.rpc.url().starts_with("https://"));
    }

    #[test]
    fn uris_are_not_rpc_commands() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(
            &dir.path().join("bitcoin.conf"),
            &matches(&["bitcoin:1BoatSLRHtKNngkdXEeobR76b53LETtpyT?amount=1"]),
        )
        .unwrap();

        assert!(config.rpc_command().is_none());
        assert_eq!(config.urls.len(), 1);
    }

    #[test]
    fn data_dir_option_places_files() {
        let dir = tempfile::tempdir().unwrap();
        let datadir = dir.path().to_string_lossy().to_string();
        let config = Config::from_matches(&matches(&["--datadir", &datadir, "--wallet", "main.sqlite3"])).unwrap();

        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.wallet_path(), dir.path().join("main.sqlite3"));
        assert_eq!(config.settings_path(), dir.path().join("coinview.json"));
    }
}
