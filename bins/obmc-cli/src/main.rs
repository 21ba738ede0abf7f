//! obmc-cli - 重叠块运动补偿命令行工具
//!
//! 用合成的参考帧与运动向量网格驱动整帧预测, 输出每个平面的
//! CRC-32 校验和, 可选地交叉校验标量与分块内核.

mod logging;
mod synth;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::Path;
use std::process;
use std::time::Instant;

use obmc_core::consts::MV_ABS_LIMIT;
use obmc_core::crc::Crc32;
use obmc_core::{CpuFlags, Pixel, Plane, RefFrame};
use obmc_mc::{
    BlendMode, KernelChoice, LaneKernels, McConfig, McContext, McKernels, MvGrid, ScalarKernels,
    predict_plane,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BlendArg {
    /// 大块使用多分辨率混合
    Auto,
    /// 只使用双线性混合
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KernelArg {
    Auto,
    Scalar,
    Accelerated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReferenceArg {
    Golden,
    Prev,
    Next,
}

impl From<ReferenceArg> for RefFrame {
    fn from(arg: ReferenceArg) -> Self {
        match arg {
            ReferenceArg::Golden => RefFrame::Golden,
            ReferenceArg::Prev => RefFrame::Prev,
            ReferenceArg::Next => RefFrame::Next,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "obmc-cli", version, about = "重叠块运动补偿预测工具")]
struct Cli {
    /// 亮度宽度 (向上对齐到 16)
    #[arg(long, default_value_t = 352)]
    width: usize,

    /// 亮度高度 (向上对齐到 16)
    #[arg(long, default_value_t = 288)]
    height: usize,

    /// 合成素材的随机种子
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// 样本位深 (8/10/12)
    #[arg(long, default_value_t = 8)]
    bit_depth: u32,

    /// 运动向量分量的最大绝对值 (1/8 亮度像素)
    #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(i32).range(0..i64::from(MV_ABS_LIMIT)))]
    max_mv: i32,

    /// 预测使用的参考帧
    #[arg(long, value_enum, default_value = "prev")]
    reference: ReferenceArg,

    /// 混合模式, 覆盖配置文件
    #[arg(long, value_enum)]
    blend: Option<BlendArg>,

    /// 内核集, 覆盖配置文件
    #[arg(long, value_enum)]
    kernels: Option<KernelArg>,

    /// 按宏块行串行预测
    #[arg(long)]
    serial: bool,

    /// JSON 格式的运动补偿配置
    #[arg(long)]
    config: Option<String>,

    /// 同时运行标量与分块内核, 输出不一致时失败
    #[arg(long)]
    cross_check: bool,

    /// 显示版本和编译信息
    #[arg(long)]
    build_info: bool,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("obmc-cli", cli.verbose) {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }

    if cli.build_info {
        print_build_info();
        return;
    }

    if let Err(e) = run(&cli) {
        log::error!("{e:#}");
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    debug!("运动补偿配置: {config:?}");

    let reference = RefFrame::from(cli.reference);
    let (grid, stats) =
        synth::motion_grid(cli.width, cli.height, cli.seed, cli.max_mv, reference)
            .context("生成运动向量网格失败")?;
    info!(
        "网格 {}x{} 宏块, {} 个有效顶点, 预测命中 {}, 平均残差 {:.2}, 参考帧命中 {}",
        grid.nhmbs(),
        grid.nvmbs(),
        stats.points,
        stats.hits,
        stats.mean_residual(),
        stats.reference_hits
    );
    debug!("分裂标志上下文分布: {:?}", stats.split_contexts);

    match cli.bit_depth {
        8 => predict_frame::<u8>(cli, &grid, config, reference),
        10 | 12 => predict_frame::<u16>(cli, &grid, config, reference),
        other => bail!("不支持的位深: {other}"),
    }
}

/// 读取配置文件并应用命令行覆盖
fn load_config(cli: &Cli) -> Result<McConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(Path::new(path))
                .with_context(|| format!("读取配置失败, path={path}"))?;
            serde_json::from_str(&text).with_context(|| format!("解析配置失败, path={path}"))?
        }
        None => McConfig::default(),
    };
    if let Some(blend) = cli.blend {
        config.blend = match blend {
            BlendArg::Auto => BlendMode::Auto,
            BlendArg::Plain => BlendMode::Plain,
        };
    }
    if let Some(kernels) = cli.kernels {
        config.kernels = match kernels {
            KernelArg::Auto => KernelChoice::Auto,
            KernelArg::Scalar => KernelChoice::Scalar,
            KernelArg::Accelerated => KernelChoice::Accelerated,
        };
    }
    if cli.serial {
        config.parallel = false;
    }
    Ok(config)
}

/// 依次预测 Y/Cb/Cr 三个平面 (4:2:0) 并打印校验和
fn predict_frame<T: Pixel>(
    cli: &Cli,
    grid: &MvGrid,
    config: McConfig,
    reference: RefFrame,
) -> Result<()> {
    let coded_width = grid.nhmbs() * 16;
    let coded_height = grid.nvmbs() * 16;
    if (coded_width, coded_height) != (cli.width, cli.height) {
        info!(
            "帧尺寸 {}x{} 对齐到宏块: {coded_width}x{coded_height}",
            cli.width, cli.height
        );
    }
    let max_mv = grid.max_abs_mv();

    for (index, name, dec) in [(0, "Y", 0), (1, "Cb", 1), (2, "Cr", 1)] {
        let (width, height) = (coded_width >> dec, coded_height >> dec);
        let padding = Plane::<T>::required_padding(max_mv, dec);
        let src = synth::reference_plane::<T>(
            width,
            height,
            dec,
            padding,
            cli.bit_depth,
            index,
            reference,
            cli.seed,
        )?;
        let ctx = McContext::new(grid, &src, config)
            .with_context(|| format!("创建 {name} 平面的运动补偿上下文失败"))?;
        let mut dst = Plane::<T>::new(width, height, dec, dec, 0, cli.bit_depth)?;

        let start = Instant::now();
        predict_plane(&ctx, &mut dst)?;
        debug!(
            "{name} 平面预测耗时 {:.3} ms (内核 {})",
            start.elapsed().as_secs_f64() * 1000.0,
            ctx.kernels().name()
        );

        if cli.cross_check {
            cross_check(grid, &src, config, &dst).with_context(|| format!("{name} 平面交叉校验失败"))?;
        }

        let mut crc = Crc32::new();
        crc.update_pixels(dst.visible_pixels());
        println!("{name}: {width}x{height} crc32={:08x}", crc.finish());
    }
    if cli.cross_check {
        info!("交叉校验通过: scalar 与 lane 输出一致");
    }
    Ok(())
}

/// 分别用标量与分块内核重新预测, 与已有输出逐样本比较
fn cross_check<T: Pixel>(
    grid: &MvGrid,
    src: &Plane<T>,
    config: McConfig,
    expected: &Plane<T>,
) -> Result<()> {
    let sets: [&'static dyn McKernels<T>; 2] = [&ScalarKernels, &LaneKernels];
    for kernels in sets {
        let ctx = McContext::with_kernels(grid, src, config, kernels)?;
        let cfg = &expected.cfg;
        let mut out = Plane::<T>::new(cfg.width, cfg.height, cfg.xdec, cfg.ydec, 0, cfg.bit_depth)?;
        predict_plane(&ctx, &mut out)?;
        if let Some(pos) = out
            .visible_pixels()
            .zip(expected.visible_pixels())
            .position(|(a, b)| a != b)
        {
            bail!(
                "内核 {} 在 ({}, {}) 处与参考输出不一致",
                kernels.name(),
                pos % cfg.width,
                pos / cfg.width
            );
        }
    }
    Ok(())
}

fn print_build_info() {
    println!("obmc-cli 版本 {}", env!("CARGO_PKG_VERSION"));
    println!("  构建目标: {}", std::env::consts::ARCH);
    println!("  操作系统: {}", std::env::consts::OS);
    println!("  编译器: rustc");
    println!();
    let flags = CpuFlags::cached();
    println!("CPU 特性: {flags}");
    let u8_kernels: &dyn McKernels<u8> = obmc_mc::select_kernels(flags, KernelChoice::Auto);
    println!("自动选择的内核集: {}", u8_kernels.name());
    println!("运动向量上限: ±{} (1/8 像素)", MV_ABS_LIMIT - 1);
}
