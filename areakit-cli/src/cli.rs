//! Définition et implémentation des commandes CLI
//!
//! Chaque commande ouvre l'espace de travail, applique l'opération à travers
//! l'historique de commandes puis réécrit le fichier d'état si besoin.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use areakit::geojson::{area_to_feature, geometry_to_wkb_hex, read_areas, write_areas};
use areakit::menu::{
    ContextItem, DialogRequest, FeatureSelection, MenuEvent, MenuTarget, ModifyLaunch, Recorder,
    SelectionRequest, SpatialMenu,
};
use areakit::merge::{merge_areas, MergeOptions};
use areakit::modify::{modify_area, ModifyOp, ModifyRequest};
use areakit::{
    AddOptions, Area, AreaCommand, AreaStore, AreaStyle, CommandHistory, CommandProcessor,
};
use clap::{Args, Subcommand, ValueEnum};
use geo::Area as _;
use tracing::{debug, info, warn};

use areakit_cli::config::Config;
use areakit_cli::report::OperationReport;
use areakit_cli::state::Workspace;

#[derive(Subcommand)]
pub enum Commands {
    /// Importer des zones depuis un fichier GeoJSON
    Import {
        /// Fichier GeoJSON (FeatureCollection, Feature ou Geometry)
        path: PathBuf,

        /// Importer les zones masquées
        #[arg(long)]
        hidden: bool,
    },

    /// Lister les zones de l'espace de travail
    List {
        /// Afficher les zones en FeatureCollection GeoJSON
        #[arg(long)]
        json: bool,
    },

    /// Afficher ou masquer une zone
    Toggle {
        id: String,

        /// État explicite (défaut: inversion)
        #[arg(long)]
        show: Option<bool>,
    },

    /// Supprimer une zone et ses entrées de requête
    Remove { id: String },

    /// Supprimer toutes les zones (ou seulement les temporaires)
    Clear {
        #[arg(long)]
        temp: bool,
    },

    /// Fusionner plusieurs zones en une nouvelle
    Merge {
        #[arg(required = true, num_args = 2..)]
        ids: Vec<String>,

        #[arg(long)]
        title: Option<String>,

        /// Supprimer les zones fusionnées
        #[arg(long)]
        replace: bool,
    },

    /// Combiner une zone avec une autre utilisée comme outil
    Modify {
        target: String,
        tool: String,

        #[arg(long, value_enum, default_value = "add")]
        op: OpArg,
    },

    /// Afficher les actions du menu disponibles pour une sélection
    Menu {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Exécuter une action du menu sur une sélection
    Dispatch {
        /// Événement du menu (load, add, exclude, add_exclude, area:merge, ...)
        event: String,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Limiter les requêtes à ces couches
        #[arg(long = "layer")]
        layers: Vec<String>,

        #[command(flatten)]
        dialog: DialogArgs,
    },

    /// Exporter des zones (toutes si aucun identifiant)
    Export {
        ids: Vec<String>,

        #[arg(long, value_enum, default_value = "geojson")]
        format: ExportFormat,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Import { .. } => "import",
            Commands::List { .. } => "list",
            Commands::Toggle { .. } => "toggle",
            Commands::Remove { .. } => "remove",
            Commands::Clear { .. } => "clear",
            Commands::Merge { .. } => "merge",
            Commands::Modify { .. } => "modify",
            Commands::Menu { .. } => "menu",
            Commands::Dispatch { .. } => "dispatch",
            Commands::Export { .. } => "export",
        }
    }
}

/// Sélection sur laquelle le menu est ouvert
#[derive(Args, Debug, Default)]
pub struct SelectionArgs {
    /// Zones de l'espace de travail
    #[arg(long = "area")]
    pub areas: Vec<String>,

    /// Formes ou entités lues dans un fichier GeoJSON
    #[arg(long)]
    pub geojson: Option<PathBuf>,

    /// Couche d'origine des entités GeoJSON
    #[arg(long)]
    pub source: Option<String>,
}

/// Réponses aux boîtes de dialogue ouvertes par une action
#[derive(Args, Debug)]
pub struct DialogArgs {
    /// Titre des zones enregistrées ou fusionnées
    #[arg(long)]
    pub title: Option<String>,

    /// Fusion: supprimer les zones fusionnées
    #[arg(long)]
    pub replace: bool,

    /// Modification: zone utilisée comme outil
    #[arg(long)]
    pub tool: Option<String>,

    /// Modification: zone cible d'une forme dessinée
    #[arg(long)]
    pub target: Option<String>,

    #[arg(long, value_enum, default_value = "add")]
    pub op: OpArg,

    #[arg(long, value_enum, default_value = "geojson")]
    pub format: ExportFormat,

    /// Fichier de sortie (défaut: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OpArg {
    Add,
    Remove,
    Intersect,
}

impl From<OpArg> for ModifyOp {
    fn from(op: OpArg) -> Self {
        match op {
            OpArg::Add => ModifyOp::Add,
            OpArg::Remove => ModifyOp::Remove,
            OpArg::Intersect => ModifyOp::Intersect,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Geojson,
    Wkb,
}

/// Sélection des entités: journalisée, la CLI n'a pas de couches chargées
struct LogSelection;

impl FeatureSelection for LogSelection {
    fn apply(&mut self, request: SelectionRequest) {
        match request {
            SelectionRequest::Select {
                layer_ids,
                exclusive,
                ..
            } => info!(layers = ?layer_ids, exclusive, "Select features"),
            SelectionRequest::Deselect { layer_ids, .. } => info!(layers = ?layer_ids, "Deselect features"),
            SelectionRequest::RemoveFeatures { layer_ids, .. } => {
                info!(layers = ?layer_ids, "Remove features")
            }
        }
    }
}

/// Exécute une commande sur l'espace de travail
pub fn run(command: Commands, state: &Path, config: &Config, report_path: Option<&Path>) -> Result<()> {
    let started = Instant::now();
    let mut ws = Workspace::open(state, config)?;
    let mut history = CommandHistory::default();
    let mut report = OperationReport::new(command.name());

    let mutated = match command {
        Commands::Import { path, hidden } => cmd_import(&mut ws, &path, hidden)?,
        Commands::List { json } => {
            cmd_list(&ws, json);
            false
        }
        Commands::Toggle { id, show } => {
            let area = find_area(&ws, &id)?;
            let show = show.unwrap_or(!area.shown);
            history.add_command(AreaCommand::toggle(&area, show).into(), &mut ws.ctx)
        }
        Commands::Remove { id } => {
            let area = find_area(&ws, &id)?;
            history.add_command(AreaCommand::remove(&area).into(), &mut ws.ctx)
        }
        Commands::Clear { temp } => {
            let removed = if temp { ws.ctx.clear_temp() } else { ws.ctx.clear() };
            info!(removed = removed.len(), temp, "Areas cleared");
            true
        }
        Commands::Merge { ids, title, replace } => {
            let areas = ids.iter().map(|id| find_area(&ws, id)).collect::<Result<Vec<_>>>()?;
            let options = MergeOptions {
                title,
                description: None,
                replace,
            };
            merge_areas(&mut ws.ctx, &mut history, &areas, &options)
        }
        Commands::Modify { target, tool, op } => {
            let tool = find_area(&ws, &tool)?;
            let request = ModifyRequest::Boolean {
                target_id: target,
                tool: tool.geometry.context("Tool area has no geometry")?,
                op: op.into(),
            };
            modify_area(&mut ws.ctx, &mut history, &request)
        }
        Commands::Menu { selection } => {
            let targets = selection_targets(&ws, &selection)?;
            let mut menu = SpatialMenu::new(config.layer_catalog());
            menu.open(targets, None, &ws.ctx)?;
            for event in menu.visible_events() {
                println!("{}", event);
            }
            false
        }
        Commands::Dispatch {
            event,
            selection,
            layers,
            dialog,
        } => cmd_dispatch(&mut ws, &mut history, config, &event, &selection, layers, &dialog)?,
        Commands::Export { ids, format, output } => {
            let areas = if ids.is_empty() {
                ws.ctx.store.get_all().into_iter().cloned().collect()
            } else {
                ids.iter().map(|id| find_area(&ws, id)).collect::<Result<Vec<_>>>()?
            };
            export_areas(&areas, format, output.as_deref())?;
            false
        }
    };

    report.record_events(&ws.ctx.store.take_events());
    if let Some(title) = history.titles().last() {
        report.record_command(title.clone());
    }
    report.record_alerts(&ws.alerts);
    report.set_duration(started.elapsed());
    report.finalize();

    if mutated {
        ws.save()?;
    }
    if mutated || !ws.alerts.is_empty() {
        report.display();
    }
    if let Some(path) = report_path {
        report.save_to_file(path)?;
    }
    Ok(())
}

fn find_area(ws: &Workspace, id: &str) -> Result<Area> {
    match ws.ctx.store.get(id) {
        Some(area) => Ok(area.clone()),
        None => bail!("Unknown area: {}", id),
    }
}

fn cmd_import(ws: &mut Workspace, path: &Path, hidden: bool) -> Result<bool> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read GeoJSON file: {}", path.display()))?;
    let mut areas = read_areas(&content).context("Failed to parse GeoJSON")?;
    if hidden {
        for area in areas.iter_mut() {
            area.shown = false;
        }
    }

    let total = areas.len();
    let accepted = ws.ctx.store.bulk_add(areas, !hidden);
    info!(path = %path.display(), accepted, total, "Areas imported");
    Ok(accepted > 0)
}

fn cmd_list(ws: &Workspace, json: bool) {
    let areas = ws.ctx.store.get_all();
    if json {
        println!("{}", write_areas(areas));
        return;
    }

    for area in areas {
        let style = match AreaStore::compute_style(&area.id, ws.ctx.ledger()) {
            AreaStyle::Inclusion => "inclusion",
            AreaStyle::Exclusion => "exclusion",
            AreaStyle::Default | AreaStyle::Highlight => "-",
        };
        let size = area.geometry.as_ref().map_or(0.0, |g| g.unsigned_area());
        println!(
            "{}\t{}\t{}\t{}\t{:.6}\t{}",
            area.id,
            area.display_title(),
            if area.shown { "shown" } else { "hidden" },
            style,
            size,
            area.tags.join(",")
        );
    }
}

/// Construit les cibles du menu depuis les arguments
fn selection_targets(ws: &Workspace, selection: &SelectionArgs) -> Result<Vec<MenuTarget>> {
    let mut targets = Vec::new();
    for id in &selection.areas {
        if !ws.ctx.store.contains(id) {
            bail!("Unknown area: {}", id);
        }
        targets.push(MenuTarget::AreaNode(id.clone()));
    }

    if let Some(path) = &selection.geojson {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read GeoJSON file: {}", path.display()))?;
        for area in read_areas(&content).context("Failed to parse GeoJSON")? {
            let item = match (&selection.source, area.id.is_empty()) {
                (Some(layer), _) => ContextItem {
                    feature: Some(area),
                    geometry: None,
                    layer_id: Some(layer.clone()),
                },
                (None, false) => ContextItem::from_area(area),
                (None, true) => ContextItem {
                    geometry: area.geometry.clone(),
                    feature: Some(area),
                    layer_id: None,
                },
            };
            targets.push(MenuTarget::Item(item));
        }
    }

    if targets.is_empty() {
        bail!("Nothing selected: use --area or --geojson");
    }
    Ok(targets)
}

fn cmd_dispatch(
    ws: &mut Workspace,
    history: &mut CommandHistory,
    config: &Config,
    event: &str,
    selection: &SelectionArgs,
    layers: Vec<String>,
    dialog: &DialogArgs,
) -> Result<bool> {
    let event: MenuEvent = event.parse()?;
    let targets = selection_targets(ws, selection)?;

    let dialogs = Recorder::<DialogRequest>::default();
    let mut menu = SpatialMenu::new(config.layer_catalog())
        .with_dialogs(dialogs.clone())
        .with_selection(LogSelection);
    menu.open(targets, None, &ws.ctx)?;

    if !menu.visible_events().contains(&event) {
        bail!("Action '{}' is not available for this selection", event);
    }

    let layers = (!layers.is_empty()).then_some(layers);
    let outcome = menu.on_menu_event(event, layers, &mut ws.ctx, history);
    debug!(?outcome, "Menu event handled");

    let mut mutated = outcome.submitted;
    for request in dialogs.take() {
        mutated |= answer_dialog(ws, history, request, dialog)?;
    }
    Ok(mutated)
}

/// Répond aux boîtes de dialogue avec les options de la ligne de commande
fn answer_dialog(
    ws: &mut Workspace,
    history: &mut CommandHistory,
    request: DialogRequest,
    dialog: &DialogArgs,
) -> Result<bool> {
    match request {
        DialogRequest::Edit { mut area, source_layer } => {
            if ws.ctx.store.contains(&area.id) {
                let title = dialog.title.clone().or_else(|| area.title.clone());
                let (id, description, tags) = (area.id, area.description, area.tags);
                return Ok(ws.ctx.store.update_details(&id, title, description, tags));
            }
            if let Some(title) = &dialog.title {
                area.title = Some(title.clone());
            }
            if let Some(layer) = source_layer {
                info!(layer = %layer, "Saving layer feature as an area");
            }
            Ok(history.add_command(AreaCommand::add(&area, AddOptions::default()).into(), &mut ws.ctx))
        }
        DialogRequest::Merge(areas) => {
            let options = MergeOptions {
                title: dialog.title.clone(),
                description: None,
                replace: dialog.replace,
            };
            Ok(merge_areas(&mut ws.ctx, history, &areas, &options))
        }
        DialogRequest::Export(areas) => {
            export_areas(&areas, dialog.format, dialog.output.as_deref())?;
            Ok(false)
        }
        DialogRequest::Modify(launch) => {
            let request = match launch {
                ModifyLaunch::Existing { target } => {
                    let Some(tool_id) = &dialog.tool else {
                        bail!("--tool is required to modify an area");
                    };
                    let tool = find_area(ws, tool_id)?;
                    ModifyRequest::Boolean {
                        target_id: target.id,
                        tool: tool.geometry.context("Tool area has no geometry")?,
                        op: dialog.op.into(),
                    }
                }
                ModifyLaunch::WithShape { shape } => {
                    let Some(target_id) = &dialog.target else {
                        bail!("--target is required to modify an area with a shape");
                    };
                    ModifyRequest::Boolean {
                        target_id: target_id.clone(),
                        tool: shape,
                        op: dialog.op.into(),
                    }
                }
                ModifyLaunch::Source { layer_id, feature } => {
                    warn!(layer = %layer_id, feature = %feature.id, "Source features are edited in their layer");
                    return Ok(false);
                }
            };
            Ok(modify_area(&mut ws.ctx, history, &request))
        }
        DialogRequest::FeatureInfo(items) => {
            for item in items {
                if let Some(feature) = &item.feature {
                    println!("{}", area_to_feature(feature));
                }
            }
            Ok(false)
        }
        DialogRequest::ChooseLayers { event } => {
            debug!(event = %event, "Layer choice is given with --layer");
            Ok(false)
        }
    }
}

fn export_areas(areas: &[Area], format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let content = match format {
        ExportFormat::Geojson => write_areas(areas),
        ExportFormat::Wkb => {
            let mut lines = Vec::with_capacity(areas.len());
            for area in areas {
                let Some(geometry) = &area.geometry else {
                    continue;
                };
                lines.push(format!("{}\t{}", area.id, geometry_to_wkb_hex(geometry)?));
            }
            lines.join("\n")
        }
    };

    match output {
        Some(path) => {
            std::fs::write(path, content)
                .context(format!("Failed to write export: {}", path.display()))?;
            info!(path = %path.display(), areas = areas.len(), "Areas exported");
        }
        None => println!("{}", content),
    }
    Ok(())
}
