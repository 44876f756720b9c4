use clap::Parser;
use cms_api::config::cli::{load_requests, load_store};
use cms_api::utils::error::{ApiError, ErrorSeverity};
use cms_api::utils::{logger, validation::Validate};
use cms_api::{ApiConfig, ApiManagerFactory, CliConfig, ServiceContainer, ServiceFactory};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 載入 TOML 配置
    let config = match ApiConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if cli.log_json || config.json_logging() {
        logger::init_json_logger(cli.verbose, config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose, config.log_level());
    }

    tracing::info!("Starting cms-api CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        fail(&e);
    }

    let store = match load_store(cli.fixtures.as_deref()).await {
        Ok(store) => store,
        Err(e) => fail(&e),
    };
    let container = Arc::new(ServiceContainer::in_memory(store).with_config(config));
    let manager = match ApiManagerFactory.create_service(container) {
        Ok(manager) => manager,
        Err(e) => fail(&e),
    };

    let requests = match load_requests(&cli.requests).await {
        Ok(requests) => requests,
        Err(e) => fail(&e),
    };
    tracing::info!("Executing {} request(s) from {}", requests.len(), cli.requests);

    let mut worst: Option<ErrorSeverity> = None;
    for request in &requests {
        match manager.execute(request) {
            Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
            Err(e) => {
                tracing::error!(
                    "❌ {} on '{}' failed: {} (Severity: {:?})",
                    request.operation,
                    request.resource,
                    e,
                    e.severity()
                );
                let body = json!({
                    "operation": request.operation,
                    "resource": request.resource,
                    "error": e.to_string(),
                    "errors": e.validation_errors(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
                worst = worst.max(Some(e.severity()));
            }
        }
    }

    // 根據最嚴重的錯誤決定退出碼
    if let Some(severity) = worst {
        let exit_code = exit_code(severity);
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn fail(e: &ApiError) -> ! {
    tracing::error!("❌ {} (Severity: {:?})", e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e);
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()));
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 請求被拒
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}
