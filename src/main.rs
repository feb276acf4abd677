use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use djmovie_pay::config::{self, LogConfig, ProcessEnv};
use djmovie_pay::payments::flow::{self, FlowReport};
use djmovie_pay::payments::providers::mpesa::{
    parse_amount, stk_password, MpesaTimestamp, StkPushAcknowledgement, StkPushRequest,
};
use djmovie_pay::payments::providers::paypal::PaypalPayment;
use djmovie_pay::payments::providers::{MpesaGateway, PaypalGateway};
use djmovie_pay::payments::PaymentGateway;
use serde_json::Number;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Initiate movie payments through M-Pesa or PayPal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// M-Pesa (Daraja) STK Push
    Mpesa {
        #[command(subcommand)]
        action: MpesaAction,
    },
    /// PayPal payment creation
    Paypal {
        #[command(subcommand)]
        action: PaypalAction,
    },
}

#[derive(Subcommand)]
enum MpesaAction {
    /// Fetch an OAuth access token and print it
    Token,
    /// Print the STK Push password for BUSINESS_SHORTCODE and PASSKEY
    Password {
        /// YYYYMMDDHHMMSS; defaults to now (UTC)
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Prompt a phone to pay
    StkPush {
        /// Payer MSISDN, e.g. 2547XXXXXXXX
        #[arg(long)]
        phone: String,
        /// Passed through unchecked, e.g. 100 or 10.5
        #[arg(long, allow_hyphen_values = true, value_parser = parse_amount)]
        amount: Number,
    },
}

#[derive(Subcommand)]
enum PaypalAction {
    /// Fetch an OAuth access token and print it
    Token,
    /// Create a sale payment and print the provider response
    Create {
        #[arg(long, default_value = "10.00")]
        total: String,
        /// Defaults to PAYPAL_CURRENCY
        #[arg(long)]
        currency: Option<String>,
        /// Defaults to PAYPAL_DESCRIPTION
        #[arg(long)]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging(&LogConfig::from_env());

    let cli = Cli::parse();
    match cli.command {
        Command::Mpesa { action } => run_mpesa(action).await,
        Command::Paypal { action } => run_paypal(action).await,
    }
}

fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_mpesa(action: MpesaAction) -> Result<()> {
    match action {
        MpesaAction::Password { timestamp } => {
            let shortcode = config::required(&ProcessEnv, "BUSINESS_SHORTCODE")?;
            let passkey = config::required(&ProcessEnv, "PASSKEY")?;
            let timestamp = match timestamp {
                Some(raw) => MpesaTimestamp::parse(&raw)?,
                None => MpesaTimestamp::now(),
            };

            println!("Generated Password: {}", stk_password(&shortcode, &passkey, &timestamp));
            println!("Timestamp: {}", timestamp);
            Ok(())
        }
        MpesaAction::Token => print_token(&mpesa_gateway()?).await,
        MpesaAction::StkPush { phone, amount } => {
            let gateway = mpesa_gateway()?;
            let request = StkPushRequest::new(phone, amount);
            let report = flow::run(&gateway, &request).await;
            if let Ok(body) = &report.outcome {
                match StkPushAcknowledgement::from_body(body) {
                    Some(ack) if !ack.is_accepted() => {
                        warn!("STK push was not accepted: {:?}", ack.response_description)
                    }
                    Some(ack) => info!(
                        "Customer prompt sent: {}",
                        ack.customer_message.as_deref().unwrap_or("-")
                    ),
                    None => {}
                }
            }
            print_report(&report)
        }
    }
}

fn mpesa_gateway() -> Result<MpesaGateway> {
    let gateway = MpesaGateway::from_env().context("Failed to load M-Pesa configuration")?;
    info!(
        "M-Pesa gateway ready: base_url={} shortcode={}",
        gateway.config().base_url,
        gateway.config().business_shortcode
    );
    Ok(gateway)
}

async fn run_paypal(action: PaypalAction) -> Result<()> {
    let gateway = PaypalGateway::from_env().context("Failed to load PayPal configuration")?;
    info!("PayPal gateway ready: base_url={}", gateway.config().base_url);

    match action {
        PaypalAction::Token => print_token(&gateway).await,
        PaypalAction::Create {
            total,
            currency,
            description,
        } => {
            let mut request = gateway.config().request(total);
            if let Some(currency) = currency {
                request.currency = currency;
            }
            if let Some(description) = description {
                request.description = description;
            }

            let report = flow::run(&gateway, &request).await;
            if let Some(url) = report
                .outcome
                .as_ref()
                .ok()
                .and_then(PaypalPayment::from_body)
                .and_then(|p| p.approval_url().map(str::to_string))
            {
                println!("Approve at: {}", url);
            }
            print_report(&report)
        }
    }
}

async fn print_token<G: PaymentGateway>(gateway: &G) -> Result<()> {
    match gateway.acquire_token().await {
        Ok(token) => println!("Access Token: {}", token.as_str()),
        // Failures are reported, not propagated: the process still exits cleanly.
        Err(e) => error!("{}: {}", e, e.body().unwrap_or("<no response body>")),
    }
    Ok(())
}

fn print_report(report: &FlowReport) -> Result<()> {
    let trail: Vec<String> = report.states.iter().map(|s| s.to_string()).collect();
    info!("{} flow states: {}", report.provider, trail.join(" -> "));

    match &report.outcome {
        Ok(body) => println!("{}", serde_json::to_string_pretty(body)?),
        Err(e) => error!("{}: {}", e, e.body().unwrap_or("<no response body>")),
    }
    Ok(())
}
