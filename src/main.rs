// src/main.rs
mod config;
mod error;
mod file_utils;
mod metrics;
mod models;
mod report;
mod sweep;
mod tui;

use anyhow::Result;
use clap::Parser;
use config::{ConfigOverrides, DEFAULT_CONFIG_PATH, load_config, placeholder_warnings};
use error::SweepError;
use models::generate_strengths;
use std::path::PathBuf;
use std::process::ExitCode;
use sweep::SweepDriver;
use tracing::error;
use tracing_subscriber::EnvFilter;
use tui::{App, TuiApp};

/// 在一组LoRA强度图片上计算BRISQUE和SSIM，并推荐最佳强度
#[derive(Debug, Parser)]
#[command(name = "lora-sweep", version, about)]
struct Cli {
    /// 配置文件路径（.toml，或 .yaml/.yml）
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[arg(long)]
    lora_dir: Option<String>,

    #[arg(long)]
    control_dir: Option<String>,

    #[arg(long)]
    min: Option<f64>,

    #[arg(long)]
    max: Option<f64>,

    #[arg(long)]
    step: Option<f64>,

    #[arg(long)]
    decimals: Option<u32>,

    /// 所有强度共用这一张对照图
    #[arg(long, value_name = "NAME")]
    single_control: Option<String>,

    /// 最佳强度的BRISQUE并列容差
    #[arg(long)]
    tolerance: Option<f64>,

    /// SSIM实现：uniform 或 gaussian
    #[arg(long)]
    ssim: Option<String>,

    /// 将报告写成JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// 扫描结束后打开交互式报告浏览器
    #[arg(long)]
    tui: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            lora_dir: self.lora_dir.clone(),
            control_dir: self.control_dir.clone(),
            min_strength: self.min,
            max_strength: self.max,
            increment: self.step,
            decimal_places: self.decimals,
            single_control: self.single_control.clone(),
            brisque_tolerance: self.tolerance,
            ssim_backend: self.ssim.clone(),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = match err.downcast_ref::<SweepError>() {
                Some(sweep_err) => {
                    error!("{}", sweep_err);
                    if let Some(hint) = sweep_err.hint() {
                        eprintln!("{}", hint);
                    }
                    sweep_err.exit_code()
                }
                None => {
                    error!("{:#}", err);
                    1
                }
            };
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli.config)?;
    cli.overrides().apply(&mut config);

    if let Some(banner) = placeholder_warnings(&config) {
        eprintln!("{}", banner);
    }

    let strengths = generate_strengths(&config.sweep)?;
    println!("Starting LoRA strength evaluation...");
    println!("LoRA images directory: {}", config.paths.lora_dir);
    if config.control.use_single_image {
        println!(
            "Using single control image: {}",
            PathBuf::from(&config.paths.control_dir)
                .join(&config.control.single_image_name)
                .display()
        );
    } else {
        println!("Control images directory: {}", config.paths.control_dir);
    }
    let listed: Vec<String> = strengths.iter().map(ToString::to_string).collect();
    println!("Testing strengths: [{}]", listed.join(", "));

    let driver = SweepDriver::new(config)?;
    let report = driver.run()?;

    println!();
    print!("{}", report::render_summary(&report));
    println!();
    print!("{}", report::render_recommendation(&report));

    if let Some(path) = &cli.json {
        report::write_json(&report, path)?;
        println!("Report written to {}", path.display());
    }

    if cli.tui {
        let tui_config = driver.config().tui.clone();
        let keybindings = driver.config().keybindings.clone();
        let mut tui_app = TuiApp::new(App::new(report, tui_config), keybindings)?;
        tui_app.run()?;
    }

    Ok(())
}
