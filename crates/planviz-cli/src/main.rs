//! planviz CLI: render query plans as text tables, DOT or Mermaid diagrams.

use clap::{Args, Parser, Subcommand, ValueEnum};
use planviz_core::config::{
    ExecutionMethodFormat, KnownFlagFormat, MermaidConfig, PlanvizConfig, RenderOptions,
    TargetMetadataFormat,
};
use planviz_decode::load_plan;
use planviz_render::{
    build_diagram, lint_plan, render_dot, render_lint, render_mermaid, render_table,
    render_table_usage, table_usage, TableMode, TreeProjector,
};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "planviz", version = planviz_core::VERSION)]
#[command(about = "Render distributed SQL query plans as trees, tables and diagrams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the plan as an ASCII tree table
    Tree {
        /// Plan file (YAML or JSON); reads stdin when omitted
        input: Option<PathBuf>,

        /// PLAN or PROFILE (ignore case)
        #[arg(long, default_value = "PLAN")]
        mode: TableMode,

        /// Wrap node text at this width (0 = no wrapping)
        #[arg(long)]
        wrap_width: Option<usize>,

        #[command(flatten)]
        title: TitleArgs,

        /// Reject unknown execution stats fields
        #[arg(long)]
        strict_stats: bool,
    },

    /// Render the plan as a DOT or Mermaid diagram
    Graph {
        /// Plan file (YAML or JSON); reads stdin when omitted
        input: Option<PathBuf>,

        /// Output diagram type
        #[arg(long = "type", value_enum, default_value_t = DiagramType::Dot)]
        diagram_type: DiagramType,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        sections: SectionArgs,

        /// Omit the `<scan type>: <target>` line
        #[arg(long)]
        hide_scan_target: bool,

        /// Comma-separated metadata keys to omit (overrides PLANVIZ_HIDE_METADATA)
        #[arg(long, value_delimiter = ',')]
        hide_metadata: Vec<String>,

        /// Add a node holding the query text
        #[arg(long)]
        show_query: bool,

        /// Add a node holding the query text and query stats
        #[arg(long)]
        show_query_stats: bool,

        /// Reject unknown execution stats fields
        #[arg(long)]
        strict_stats: bool,
    },

    /// Print table usages and advisories for expensive operators
    Lint {
        /// Plan file (YAML or JSON); reads stdin when omitted
        input: Option<PathBuf>,

        /// Count scans of INDEX as scans of TABLE (repeatable)
        #[arg(long = "index-table", value_name = "INDEX=TABLE", value_parser = parse_index_table)]
        index_tables: Vec<(String, String)>,
    },

    /// Decode the plan and check that it renders
    Validate {
        /// Plan file (YAML or JSON); reads stdin when omitted
        input: Option<PathBuf>,

        /// Reject unknown execution stats fields
        #[arg(long)]
        strict_stats: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DiagramType {
    Dot,
    Mermaid,
}

#[derive(Debug, Clone, Default, Args)]
struct TitleArgs {
    /// raw | angle
    #[arg(long)]
    execution_method: Option<ExecutionMethodFormat>,

    /// raw | on
    #[arg(long)]
    target_metadata: Option<TargetMetadataFormat>,

    /// raw | label
    #[arg(long)]
    known_flag: Option<KnownFlagFormat>,

    /// Compact tree layout and titles
    #[arg(long)]
    compact: bool,
}

#[derive(Debug, Clone, Default, Args)]
struct SectionArgs {
    #[arg(long)]
    non_variable_scalar: bool,
    #[arg(long)]
    variable_scalar: bool,
    #[arg(long)]
    metadata: bool,
    #[arg(long)]
    execution_stats: bool,
    #[arg(long)]
    execution_summary: bool,
    #[arg(long)]
    serialize_result: bool,
    /// Turn on every section
    #[arg(long)]
    full: bool,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let config = PlanvizConfig::from_env();
    debug!(render = ?config.render, "configuration loaded from environment");

    match command {
        Commands::Tree {
            input,
            mode,
            wrap_width,
            title,
            strict_stats,
        } => {
            let mut options = config.render;
            apply_title_args(&mut options, &title);
            if let Some(width) = wrap_width {
                options.wrap_width = width;
            }
            options.strict_stats |= strict_stats;
            print!("{}", tree_command(input.as_deref(), mode, &options)?);
        }
        Commands::Graph {
            input,
            diagram_type,
            output,
            sections,
            hide_scan_target,
            hide_metadata,
            show_query,
            show_query_stats,
            strict_stats,
        } => {
            let mut options = config.render;
            apply_section_args(&mut options, &sections);
            options.hide_scan_target |= hide_scan_target;
            if !hide_metadata.is_empty() {
                options.hide_metadata = hide_metadata;
            }
            options.show_query |= show_query;
            options.show_query_stats |= show_query_stats;
            options.strict_stats |= strict_stats;

            let text = graph_command(input.as_deref(), diagram_type, &options, &config.mermaid)?;
            match output {
                Some(path) => {
                    fs::write(&path, text)?;
                    info!(path = %path.display(), "diagram written");
                }
                None => print!("{}", text),
            }
        }
        Commands::Lint {
            input,
            index_tables,
        } => {
            let index_tables: HashMap<String, String> = index_tables.into_iter().collect();
            print!("{}", lint_command(input.as_deref(), &index_tables)?);
        }
        Commands::Validate {
            input,
            strict_stats,
        } => {
            let mut options = config.render;
            options.strict_stats |= strict_stats;
            let summary = validate_command(input.as_deref(), &options)?;
            println!("✓ {}", summary);
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> io::Result<String> {
    match path {
        Some(p) => fs::read_to_string(p),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn parse_index_table(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((index, table)) if !index.is_empty() && !table.is_empty() => {
            Ok((index.to_string(), table.to_string()))
        }
        _ => Err(format!("expected INDEX=TABLE, got `{s}`")),
    }
}

fn apply_title_args(options: &mut RenderOptions, args: &TitleArgs) {
    if let Some(f) = args.execution_method {
        options.title.execution_method = f;
    }
    if let Some(f) = args.target_metadata {
        options.title.target_metadata = f;
    }
    if let Some(f) = args.known_flag {
        options.title.known_flag = f;
    }
    options.title.compact |= args.compact;
}

fn apply_section_args(options: &mut RenderOptions, args: &SectionArgs) {
    let s = &mut options.sections;
    s.non_variable_scalar |= args.non_variable_scalar;
    s.variable_scalar |= args.variable_scalar;
    s.metadata |= args.metadata;
    s.execution_stats |= args.execution_stats;
    s.execution_summary |= args.execution_summary;
    s.serialize_result |= args.serialize_result;
    if args.full {
        s.apply_full();
    }
}

fn tree_command(
    input: Option<&Path>,
    mode: TableMode,
    options: &RenderOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let plan = load_plan(&read_input(input)?)?;
    let rows = TreeProjector::new(&plan.graph, options).project()?;
    Ok(render_table(&rows, mode))
}

fn graph_command(
    input: Option<&Path>,
    diagram_type: DiagramType,
    options: &RenderOptions,
    mermaid: &MermaidConfig,
) -> Result<String, Box<dyn std::error::Error>> {
    let plan = load_plan(&read_input(input)?)?;
    let diagram = build_diagram(
        &plan.graph,
        options,
        plan.row_type.as_ref(),
        plan.query_stats.as_ref(),
    )?;
    Ok(match diagram_type {
        DiagramType::Dot => render_dot(&diagram),
        DiagramType::Mermaid => render_mermaid(&diagram, mermaid),
    })
}

fn lint_command(
    input: Option<&Path>,
    index_tables: &HashMap<String, String>,
) -> Result<String, Box<dyn std::error::Error>> {
    let plan = load_plan(&read_input(input)?)?;
    let mut out = render_table_usage(&table_usage(&plan.graph, index_tables));
    out.push_str(&render_lint(&lint_plan(&plan.graph)));
    Ok(out)
}

fn validate_command(
    input: Option<&Path>,
    options: &RenderOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let plan = load_plan(&read_input(input)?)?;
    let rows = TreeProjector::new(&plan.graph, options).project()?;
    let mut full = options.clone();
    full.sections.apply_full();
    build_diagram(&plan.graph, &full, plan.row_type.as_ref(), plan.query_stats.as_ref())?;
    Ok(format!(
        "Plan is valid ({}, {} nodes, {} visible)",
        plan.shape.as_str(),
        plan.graph.len(),
        rows.len()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn plan_file(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    const PLAN: &str = r#"
planNodes:
- displayName: Distributed Union
  childLinks: [{childIndex: 1}]
- index: 1
  displayName: Scan
  childLinks: [{childIndex: 2, type: Residual Condition}]
  metadata: {scan_type: TableScan, scan_target: Singers, execution_method: Row}
- index: 2
  kind: SCALAR
  displayName: Function
  shortRepresentation: {description: ($x > 1)}
"#;

    #[test]
    fn tree_subcommand_parses_formats() {
        let cli = Cli::try_parse_from([
            "planviz",
            "tree",
            "plan.yaml",
            "--mode",
            "profile",
            "--execution-method",
            "angle",
            "--known-flag",
            "LABEL",
            "--compact",
        ])
        .unwrap();
        let Commands::Tree {
            input, mode, title, ..
        } = cli.command
        else {
            panic!("expected tree");
        };
        assert_eq!(input, Some(PathBuf::from("plan.yaml")));
        assert_eq!(mode, TableMode::Profile);
        let mut options = RenderOptions::default();
        apply_title_args(&mut options, &title);
        assert_eq!(options.title.execution_method, ExecutionMethodFormat::Angle);
        assert_eq!(options.title.known_flag, KnownFlagFormat::Label);
        assert_eq!(options.title.target_metadata, TargetMetadataFormat::Raw);
        assert!(options.title.compact);
    }

    #[test]
    fn graph_full_turns_on_every_section() {
        let cli = Cli::try_parse_from([
            "planviz",
            "graph",
            "--type",
            "mermaid",
            "--full",
            "--hide-metadata",
            "a,b",
        ])
        .unwrap();
        let Commands::Graph {
            diagram_type,
            sections,
            hide_metadata,
            ..
        } = cli.command
        else {
            panic!("expected graph");
        };
        assert_eq!(diagram_type, DiagramType::Mermaid);
        assert_eq!(hide_metadata, vec!["a", "b"]);
        let mut options = RenderOptions::default();
        apply_section_args(&mut options, &sections);
        assert!(options.sections.serialize_result && options.sections.variable_scalar);
    }

    #[test]
    fn unknown_format_value_is_rejected() {
        assert!(Cli::try_parse_from(["planviz", "tree", "--target-metadata", "over"]).is_err());
    }

    #[test]
    fn tree_command_renders_table_and_predicates() {
        let file = plan_file(PLAN);
        let path = file.path();
        let text = tree_command(Some(path), TableMode::Plan, &RenderOptions::default()).unwrap();
        assert!(text.contains("| *1 | +- Table Scan (Table: Singers, execution_method: Row) |"));
        assert!(text.contains("Predicates (identified by ID):\n 1: Residual Condition: ($x > 1)\n"));
    }

    #[test]
    fn graph_command_writes_dot_and_mermaid() {
        let file = plan_file(PLAN);
        let path = file.path();
        let options = RenderOptions::default();
        let mermaid = MermaidConfig::default();
        let dot = graph_command(Some(path), DiagramType::Dot, &options, &mermaid).unwrap();
        assert!(dot.starts_with("digraph {\n"));
        assert!(dot.contains("node1 -> node0"));
        let md = graph_command(Some(path), DiagramType::Mermaid, &options, &mermaid).unwrap();
        assert!(md.contains("graph TD\n"));
        assert!(md.contains("    node0 --> node1\n"));
    }

    #[test]
    fn lint_command_prints_usages_before_findings() {
        let file = plan_file(PLAN);
        let text = lint_command(Some(file.path()), &HashMap::new()).unwrap();
        assert_eq!(
            text,
            concat!(
                "Table Usages\n",
                "  Singers [1:Table Scan(Singers)]\n",
                "1: Table Scan (Table: Singers, execution_method: Row)\n",
                "    Residual Condition: Expensive Residual Condition: Try to translate it to Scan Condition\n",
            )
        );
    }

    #[test]
    fn index_table_flag_needs_both_sides() {
        let cli = Cli::try_parse_from([
            "planviz",
            "lint",
            "--index-table",
            "AlbumsByTitle=Albums",
            "--index-table",
            "SongsBySinger=Songs",
        ])
        .unwrap();
        let Commands::Lint { index_tables, .. } = cli.command else {
            panic!("expected lint");
        };
        assert_eq!(
            index_tables,
            vec![
                ("AlbumsByTitle".to_string(), "Albums".to_string()),
                ("SongsBySinger".to_string(), "Songs".to_string()),
            ]
        );
        assert!(Cli::try_parse_from(["planviz", "lint", "--index-table", "Albums"]).is_err());
        assert!(Cli::try_parse_from(["planviz", "lint", "--index-table", "=Albums"]).is_err());
    }

    #[test]
    fn validate_reports_shape_and_counts() {
        let file = plan_file(PLAN);
        let path = file.path();
        let summary = validate_command(Some(path), &RenderOptions::default()).unwrap();
        assert_eq!(summary, "Plan is valid (query plan, 3 nodes, 2 visible)");
    }

    #[test]
    fn invalid_input_surfaces_as_error() {
        let file = plan_file("foo: 1\n");
        let path = file.path();
        let err = validate_command(Some(path), &RenderOptions::default()).unwrap_err();
        assert!(err.to_string().contains("unknown input format"));
    }
}
