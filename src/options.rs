use std::str::FromStr;
use structopt::StructOpt;
use tx_tracker_lib::err_custom_create;
use tx_tracker_lib::error::TrackerError;
use tx_tracker_lib::status::TxStatus;
use tx_tracker_lib::utils::parse_h256;
use web3::types::H256;

#[derive(Debug, StructOpt)]
pub struct RunOptions {
    #[structopt(long = "chain-name", default_value = "polygon")]
    pub chain_name: String,

    #[structopt(long = "config", default_value = "config-tracker.toml")]
    pub config: String,

    #[structopt(
        long = "max-fetch-attempts",
        help = "Overrides max-fetch-attempts from the config file"
    )]
    pub max_fetch_attempts: Option<u32>,

    #[structopt(long = "http", help = "Enable read-only http status server")]
    pub http: bool,

    #[structopt(long = "http-addr", default_value = "127.0.0.1")]
    pub http_addr: String,

    #[structopt(long = "http-port", default_value = "8080")]
    pub http_port: u16,
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "tx_status_tracker",
    about = "Follows pending transactions and new blocks, keeping transaction statuses in sqlite"
)]
enum CliOptions {
    /// Start tracking.
    #[structopt(name = "run")]
    Run(RunOptions),
    /// Print the stored record of one transaction.
    #[structopt(name = "show-tx")]
    ShowTx {
        #[structopt(help = "Transaction hash (0x prefixed)")]
        tx_hash: String,
    },
    /// Print stored records, most recently updated first.
    #[structopt(name = "list-txs")]
    ListTxs {
        #[structopt(long = "status")]
        status: Option<String>,

        #[structopt(long = "limit", default_value = "20")]
        limit: i64,
    },
}

pub enum ValidatedCommand {
    Run(RunOptions),
    ShowTx(H256),
    ListTxs {
        status: Option<TxStatus>,
        limit: i64,
    },
}

pub fn validated_cli() -> Result<ValidatedCommand, TrackerError> {
    let opt: CliOptions = CliOptions::from_args();
    match opt {
        CliOptions::Run(run_options) => {
            if run_options.max_fetch_attempts == Some(0) {
                return Err(err_custom_create!("max-fetch-attempts has to be at least 1"));
            }
            Ok(ValidatedCommand::Run(run_options))
        }
        CliOptions::ShowTx { tx_hash } => {
            let tx_hash = parse_h256(&tx_hash)
                .map_err(|err| err_custom_create!("Invalid tx hash {}: {}", tx_hash, err))?;
            Ok(ValidatedCommand::ShowTx(tx_hash))
        }
        CliOptions::ListTxs { status, limit } => {
            let status = status
                .map(|s| TxStatus::from_str(&s))
                .transpose()
                .map_err(|err| err_custom_create!("{}", err))?;
            if limit <= 0 {
                return Err(err_custom_create!("limit has to be positive"));
            }
            Ok(ValidatedCommand::ListTxs { status, limit })
        }
    }
}
