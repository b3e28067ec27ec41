//! itv2-gatewayd — standalone gateway daemon.
//!
//! Configuration comes from the environment:
//!
//! | Variable              | Meaning                                   |
//! |-----------------------|-------------------------------------------|
//! | `ITV2_LISTEN_PORT`    | TCP port (default 3072)                   |
//! | `ITV2_ACCESS_CODE`    | Type 1 Integration Access Code (8 digits) |
//! | `ITV2_ID_NUMBER`      | Type 1 Identification Number (8 digits)   |
//! | `ITV2_ACCESS_CODE_T2` | Type 2 Access Code (32 hex chars)         |
//!
//! Run with `RUST_LOG=itv2_gateway=debug` for wire-level logging.

use itv2_gateway::{Gateway, GatewayConfig};

#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        // SAFETY: single-threaded at this point, no other threads reading env
        unsafe { std::env::set_var("RUST_LOG", "itv2_gateway=info,itv2_gatewayd=info"); }
    }
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("\n✗ {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config_from_env()?;
    if cfg.access_code_type1.is_none() && cfg.access_code_type2.is_none() {
        eprintln!("No integration secrets configured; panels requesting encryption will be refused.");
        eprintln!("Set ITV2_ACCESS_CODE + ITV2_ID_NUMBER and/or ITV2_ACCESS_CODE_T2.");
    }

    let (gateway, mut events) = Gateway::bind(cfg).await?;
    println!("itv2-gatewayd listening on {}", gateway.local_addr()?);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!(
                "[{}] session {}: {:?}",
                event.received_at.format("%H:%M:%S%.3f"),
                event.session_id,
                event.message
            );
        }
    });

    tokio::select! {
        result = gateway.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down …");
            gateway.shutdown();
        }
    }
    Ok(())
}

fn config_from_env() -> Result<GatewayConfig, std::num::ParseIntError> {
    let mut cfg = GatewayConfig::default();
    if let Ok(port) = std::env::var("ITV2_LISTEN_PORT") {
        cfg.listen_port = port.parse()?;
    }
    cfg.access_code_type1 = std::env::var("ITV2_ACCESS_CODE").ok();
    cfg.id_number = std::env::var("ITV2_ID_NUMBER").ok();
    cfg.access_code_type2 = std::env::var("ITV2_ACCESS_CODE_T2").ok();
    Ok(cfg)
}
