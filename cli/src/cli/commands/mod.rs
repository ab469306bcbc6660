use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::process;

use anyhow::{Context as _, Result, anyhow, bail};
use regionsim_core::Simulation;

use super::{
    parse_number, parse_years, print_country_details, print_help, print_levers, print_overview,
    print_report, resolve_country,
};

pub struct Context<'a> {
    simulation: &'a mut Simulation,
}

impl<'a> Context<'a> {
    pub fn new(simulation: &'a mut Simulation) -> Self {
        Self { simulation }
    }

    pub fn simulation(&self) -> &Simulation {
        &*self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut *self.simulation
    }
}

pub struct Args<'a> {
    tokens: Vec<&'a str>,
    index: usize,
}

impl<'a> Args<'a> {
    pub fn new(tokens: Vec<&'a str>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn next(&mut self) -> Option<&'a str> {
        let value = self.tokens.get(self.index).copied()?;
        self.index += 1;
        Some(value)
    }

    pub fn next_required(&mut self, message: &str) -> Result<&'a str> {
        self.next().ok_or_else(|| anyhow!(message.to_owned()))
    }
}

pub trait Command {
    fn name() -> &'static str;
    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()>;
}

type CommandFn = for<'a> fn(&mut Context<'a>, Args<'a>) -> Result<()>;

pub struct CommandRegistry {
    handlers: HashMap<&'static str, CommandFn>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<C: Command>(&mut self) {
        let name = C::name();
        if self.handlers.insert(name, C::execute).is_some() {
            panic!("重複したコマンド登録です: {name}");
        }
    }

    pub fn dispatch<'a>(&self, command: &str, ctx: &mut Context<'a>, args: Args<'a>) -> Result<()> {
        if let Some(handler) = self.handlers.get(command) {
            handler(ctx, args)
        } else {
            bail!("未対応のコマンドです: {command}. help で一覧を確認してください。");
        }
    }

    pub fn execute_input<'a>(&self, ctx: &mut Context<'a>, input: &'a str) -> Result<()> {
        let mut parts = input.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(anyhow!("コマンドが指定されていません。"));
        };
        let command_name = head.to_ascii_lowercase();
        let args = Args::new(parts.collect());
        self.dispatch(command_name.as_str(), ctx, args)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register::<HelpCommand>();
        registry.register::<HelpAliasCommand>();
        registry.register::<OverviewCommand>();
        registry.register::<OverviewAliasCommand>();
        registry.register::<InspectCommand>();
        registry.register::<ShowCommand>();
        registry.register::<LeversCommand>();
        registry.register::<SetCommand>();
        registry.register::<ClearCommand>();
        registry.register::<AdvanceCommand>();
        registry.register::<EndCommand>();
        registry.register::<SpilloversCommand>();
        registry.register::<EventsCommand>();
        registry.register::<ScoreCommand>();
        registry.register::<ExportCommand>();
        registry.register::<QuitCommand>();
        registry.register::<ExitCommand>();
        registry
    }
}

pub struct HelpCommand;

impl Command for HelpCommand {
    fn name() -> &'static str {
        "help"
    }

    fn execute(_ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        print_help();
        Ok(())
    }
}

pub struct HelpAliasCommand;

impl Command for HelpAliasCommand {
    fn name() -> &'static str {
        "?"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        HelpCommand::execute(ctx, args)
    }
}

pub struct OverviewCommand;

impl Command for OverviewCommand {
    fn name() -> &'static str {
        "overview"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        print_overview(ctx.simulation());
        Ok(())
    }
}

pub struct OverviewAliasCommand;

impl Command for OverviewAliasCommand {
    fn name() -> &'static str {
        "ov"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        OverviewCommand::execute(ctx, args)
    }
}

pub struct InspectCommand;

impl Command for InspectCommand {
    fn name() -> &'static str {
        "inspect"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let simulation = ctx.simulation();
        let country = match args.next() {
            Some(token) => resolve_country(simulation, token)?,
            None => resolve_country(simulation, simulation.player())?,
        };
        print_country_details(simulation, country);
        Ok(())
    }
}

pub struct ShowCommand;

impl Command for ShowCommand {
    fn name() -> &'static str {
        "show"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        InspectCommand::execute(ctx, args)
    }
}

pub struct LeversCommand;

impl Command for LeversCommand {
    fn name() -> &'static str {
        "levers"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        print_levers(ctx.simulation())
    }
}

pub struct SetCommand;

impl Command for SetCommand {
    fn name() -> &'static str {
        "set"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let lever = args.next_required("政策レバーを指定してください (levers で一覧)。")?;
        let value = parse_number(args.next_required("政策値を指定してください。")?, "政策値")?;
        let decision = ctx.simulation_mut().set_player_decision(lever, value)?;
        if decision.value != value {
            println!(
                "{} は範囲 {:.1} - {:.1} に収まるよう {:.2} に調整されました。",
                decision.id, decision.min, decision.max, decision.value
            );
        } else {
            println!("{} を {:.2} に設定しました。", decision.id, decision.value);
        }
        Ok(())
    }
}

pub struct ClearCommand;

impl Command for ClearCommand {
    fn name() -> &'static str {
        "clear"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        ctx.simulation_mut().clear_player_decisions();
        println!("予約した政策値を取り消しました。");
        Ok(())
    }
}

pub struct AdvanceCommand;

impl Command for AdvanceCommand {
    fn name() -> &'static str {
        "advance"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let years = parse_years(args.next())?;
        for _ in 0..years {
            let report = ctx.simulation_mut().advance_year()?;
            print_report(&report);
        }
        Ok(())
    }
}

pub struct EndCommand;

impl Command for EndCommand {
    fn name() -> &'static str {
        "end"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        AdvanceCommand::execute(ctx, args)
    }
}

pub struct SpilloversCommand;

impl Command for SpilloversCommand {
    fn name() -> &'static str {
        "spillovers"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let simulation = ctx.simulation();
        let mode = args.next().map(str::to_ascii_lowercase);
        match mode.as_deref() {
            None => {
                let Some((year, spillovers)) = simulation.spillover_log().iter().next_back() else {
                    println!("まだスピルオーバーの記録はありません。advance で年を進めてください。");
                    return Ok(());
                };
                println!("{} 年のスピルオーバー ({} 件):", year, spillovers.len());
                for spill in spillovers {
                    println!(
                        "  {} -> {} [{} / {:?} / {}] {:+.3}: {}",
                        spill.source_country,
                        spill.target_country,
                        spill.policy_type,
                        spill.magnitude,
                        spill.timeframe.as_str(),
                        spill.effect,
                        spill.description
                    );
                }
            }
            Some("detail") => {
                let Some((year, spillovers)) = simulation.detailed_log().iter().next_back() else {
                    println!("まだ品目別スピルオーバーの記録はありません。");
                    return Ok(());
                };
                println!("{} 年の品目別スピルオーバー ({} 件):", year, spillovers.len());
                for spill in spillovers {
                    println!(
                        "  {} [{} / {} / 信頼度 {:.2}] {:+.3}: {}",
                        spill.target_country,
                        spill.sector,
                        spill.trade_products.join(", "),
                        spill.confidence,
                        spill.effect,
                        spill.description
                    );
                }
            }
            Some("json") => {
                let latest = simulation.detailed_log().iter().next_back();
                let json = serde_json::to_string_pretty(&latest.map(|(_, spills)| spills))
                    .context("JSON への変換に失敗しました")?;
                println!("{json}");
            }
            Some(other) => bail!("未知の表示形式です: {} (detail または json)", other),
        }
        Ok(())
    }
}

pub struct EventsCommand;

impl Command for EventsCommand {
    fn name() -> &'static str {
        "events"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        let history = ctx.simulation().event_history();
        if history.is_empty() {
            println!("まだ地域イベントは発生していません。");
            return Ok(());
        }
        for event in history {
            println!(
                "{}: {} - {} (対象: {})",
                event.year,
                event.name,
                event.description,
                event.target_countries.join(", ")
            );
        }
        Ok(())
    }
}

pub struct ScoreCommand;

impl Command for ScoreCommand {
    fn name() -> &'static str {
        "score"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        let simulation = ctx.simulation();
        println!(
            "{} のスコア: {:.0} / 1000 ({} 年分の記録)",
            simulation.player(),
            simulation.current_score(),
            simulation.player_history().len().saturating_sub(1)
        );
        Ok(())
    }
}

pub struct ExportCommand;

impl Command for ExportCommand {
    fn name() -> &'static str {
        "export"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let path = args.next_required("出力先のパスを指定してください。")?;
        let file = File::create(path)
            .with_context(|| format!("ファイルを作成できません: {}", path))?;
        ctx.simulation().export_csv(BufWriter::new(file))?;
        println!("履歴を {} に書き出しました。", path);
        Ok(())
    }
}

pub struct QuitCommand;

impl Command for QuitCommand {
    fn name() -> &'static str {
        "quit"
    }

    fn execute(_ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        println!("シミュレーションを終了します。");
        process::exit(0);
    }
}

pub struct ExitCommand;

impl Command for ExitCommand {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        QuitCommand::execute(ctx, args)
    }
}
