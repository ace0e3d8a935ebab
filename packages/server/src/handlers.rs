//! HTTP handler functions for the AIS map API.

use std::collections::{BTreeMap, BTreeSet};

use actix_web::{HttpResponse, web};
use ais_map_color::{ColorEncoding, ColorError, Legend, Rgb};
use ais_map_database::{DbError, SelectError};
use ais_map_database_models::{BoundingBox, BoundingBoxError, SelectionFilter, TimeRange};
use ais_map_dataset::{
    CappedRows, Dataset, assemble_from_store, cap_points, category_labels, filter_by_type,
    sample_per_vessel,
};
use ais_map_server_models::{
    ApiDestinations, ApiError, ApiHealth, ApiMapView, ApiReport, ApiTrajectories,
    DestinationQueryParams, MapQueryParams,
};
use ais_map_spatial::{
    Extent, FrameSource, FramingError, MapFrame, footprint_collection, frame, mask_collection,
    trajectories, trajectory_collection,
};
use ais_map_vessel_models::{EnrichedReport, MmsiListError, parse_mmsi_list};
use geojson::JsonValue;

use crate::AppState;

/// Errors answering an API request.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Selection failed.
    #[error(transparent)]
    Select(#[from] SelectError),

    /// The vessel list is malformed.
    #[error(transparent)]
    MmsiList(#[from] MmsiListError),

    /// The color options are invalid.
    #[error(transparent)]
    Color(#[from] ColorError),

    /// The drawn zone is invalid.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// A store lookup outside selection failed.
    #[error(transparent)]
    Store(#[from] DbError),

    /// A query parameter is malformed.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

impl ServerError {
    const fn is_client_error(&self) -> bool {
        match self {
            Self::Select(SelectError::InvalidFilter)
            | Self::MmsiList(_)
            | Self::Color(_)
            | Self::Framing(_)
            | Self::InvalidParameter { .. } => true,
            Self::Select(SelectError::StoreUnavailable(_)) | Self::Store(_) => false,
        }
    }

    /// Logs the error and renders it: 400 for bad input, 502 when the
    /// store failed.
    fn response(&self, context: &str) -> HttpResponse {
        let body = ApiError {
            error: self.to_string(),
        };

        if self.is_client_error() {
            log::warn!("{context}: {self}");
            HttpResponse::BadRequest().json(body)
        } else {
            log::error!("{context}: {self}");
            HttpResponse::BadGateway().json(ApiError {
                error: format!("{context}: {self}"),
            })
        }
    }
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/map`
///
/// Selects, assembles and colors reports and returns everything a
/// renderer needs: frame, footprints, outside mask and legend.
pub async fn map_view(
    state: web::Data<AppState>,
    params: web::Query<MapQueryParams>,
) -> HttpResponse {
    match build_map_view(&state, &params).await {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => e.response("Failed to build map"),
    }
}

/// `GET /api/trajectories`
///
/// Same selection as `/api/map`, returned as one line per vessel.
pub async fn trajectory_view(
    state: web::Data<AppState>,
    params: web::Query<MapQueryParams>,
) -> HttpResponse {
    match build_trajectories(&state, &params).await {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => e.response("Failed to build trajectories"),
    }
}

/// `GET /api/destinations`
///
/// Most recent declared destinations of each listed vessel.
pub async fn destinations(
    state: web::Data<AppState>,
    params: web::Query<DestinationQueryParams>,
) -> HttpResponse {
    let result = async {
        let range = time_range(params.from, params.to, "to")?;
        let mmsis = parse_mmsi_list(&params.mmsis)?;
        let rows = state.store.destinations(&range, &mmsis).await?;
        Ok::<_, ServerError>(ApiDestinations::group(rows))
    }
    .await;

    match result {
        Ok(grouped) => HttpResponse::Ok().json(grouped),
        Err(e) => e.response("Failed to query destinations"),
    }
}

/// `DELETE /api/cache`
///
/// Drops every memoized selection.
pub async fn invalidate_cache(state: web::Data<AppState>) -> HttpResponse {
    let dropped = state.cache.len();
    state.cache.invalidate();
    log::info!("Dropped {dropped} cached selection(s)");
    HttpResponse::NoContent().finish()
}

/// Rows that survived the display filters, with their colors.
struct Displayed {
    dataset: Dataset,
    categories: Vec<String>,
    capped: CappedRows,
    colors: Vec<Rgb>,
    legend: Legend,
}

/// Parses the filter, assembles the dataset and applies the display
/// filters and the color encoding.
async fn display(
    state: &AppState,
    params: &MapQueryParams,
    filter: &SelectionFilter,
) -> Result<Displayed, ServerError> {
    let encoding = ColorEncoding::from_parts(
        params.color.as_deref(),
        params.color_by_type.unwrap_or(false).then(Vec::new),
    )?;

    state.cache.begin_cycle(filter);

    let config = &state.config.dataset;
    let dataset = assemble_from_store(
        state.store.as_ref(),
        &state.cache,
        filter,
        params.mode.unwrap_or_default(),
        config,
    )
    .await?;

    let categories = category_labels(&dataset.enriched);

    let filtered = match params.types.as_deref().map(parse_labels) {
        Some(labels) if !labels.is_empty() => filter_by_type(&dataset.enriched, &labels),
        _ => dataset.enriched.clone(),
    };

    let sampled = if filter.has_vessel_list() {
        let quotas: BTreeMap<_, _> = params
            .per_vessel
            .map(|quota| dataset.identifiers.iter().map(|m| (*m, quota)).collect())
            .unwrap_or_default();
        sample_per_vessel(&filtered, &quotas, config.sample_seed)
    } else {
        filtered
    };

    let capped = cap_points(
        &sampled,
        params.max_points.unwrap_or(config.max_points),
        config.cap_seed,
    );

    let encoding = match encoding {
        ColorEncoding::Categorical { .. } => ColorEncoding::by_type(categories.clone()),
        other => other,
    };
    let (colors, legend) = encoding.encode(&capped.rows);

    Ok(Displayed {
        dataset,
        categories,
        capped,
        colors,
        legend,
    })
}

async fn build_map_view(
    state: &AppState,
    params: &MapQueryParams,
) -> Result<ApiMapView, ServerError> {
    let (filter, drawn) = parse_filter(params)?;
    let shown = display(state, params, &filter).await?;
    let list_mode = filter.has_vessel_list();

    let map_frame = frame_of(state, drawn, &shown.capped.rows, list_mode);

    let colors = &shown.colors;
    let footprints = footprint_collection(
        &shown.capped.rows,
        params.shape.unwrap_or_default(),
        &state.config.footprint,
        |i, properties| {
            properties.insert("color".to_string(), JsonValue::from(colors[i].to_string()));
        },
    );

    let mask = drawn
        .filter(|_| !list_mode)
        .map(|extent| mask_collection(&extent.outside_mask()));

    Ok(ApiMapView {
        frame: map_frame,
        footprints,
        mask,
        legend: shown.legend,
        identifiers: shown.dataset.identifiers.into_iter().collect(),
        categories: shown.categories,
        truncated: shown.capped.truncated,
        latest_displayed: shown.capped.latest_displayed,
        reports: api_reports(shown.capped.rows, shown.colors),
    })
}

async fn build_trajectories(
    state: &AppState,
    params: &MapQueryParams,
) -> Result<ApiTrajectories, ServerError> {
    let (filter, drawn) = parse_filter(params)?;
    let shown = display(state, params, &filter).await?;

    let lines = trajectories(&shown.capped.rows);
    let map_frame = frame_of(state, drawn, &shown.capped.rows, filter.has_vessel_list());

    Ok(ApiTrajectories {
        frame: map_frame,
        trajectories: trajectory_collection(&lines),
        legend: shown.legend,
        truncated: shown.capped.truncated,
        latest_displayed: shown.capped.latest_displayed,
        reports: api_reports(shown.capped.rows, shown.colors),
    })
}

fn frame_of(
    state: &AppState,
    drawn: Option<Extent>,
    rows: &[EnrichedReport],
    list_mode: bool,
) -> Option<MapFrame> {
    FrameSource::choose(drawn, rows, list_mode)
        .and_then(|source| frame(source, &state.config.framing))
}

fn api_reports(rows: Vec<EnrichedReport>, colors: Vec<Rgb>) -> Vec<ApiReport> {
    rows.into_iter()
        .zip(colors)
        .map(|(row, color)| ApiReport::new(row, color))
        .collect()
}

/// Builds the selection filter and the drawn zone from query parameters.
///
/// `bbox` wins over `zone` when both are given.
fn parse_filter(params: &MapQueryParams) -> Result<(SelectionFilter, Option<Extent>), ServerError> {
    let mut filter = SelectionFilter::new(time_range(params.from, params.to, "to")?);

    let drawn = match (params.bbox.as_deref(), params.zone.as_deref()) {
        (Some(bbox), _) => Some(Extent::from_bbox(&parse_bbox(bbox)?)),
        (None, Some(zone)) => Some(Extent::from_geojson(zone)?),
        (None, None) => None,
    };

    if let Some(extent) = drawn {
        filter = filter.with_bbox(extent.to_bbox());
    }

    if let Some(list) = params.mmsis.as_deref() {
        filter = filter.with_mmsis(parse_mmsi_list(list)?);
    }

    match (params.from2, params.to2) {
        (Some(start), Some(end)) => {
            filter = filter.with_trajectory_range(time_range(start, end, "to2")?);
        }
        (None, None) => {}
        _ => {
            return Err(ServerError::InvalidParameter {
                name: "from2",
                message: "from2 and to2 must be given together".to_string(),
            });
        }
    }

    Ok((filter, drawn))
}

fn time_range(
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
    name: &'static str,
) -> Result<TimeRange, ServerError> {
    if end < start {
        return Err(ServerError::InvalidParameter {
            name,
            message: format!("{end} is before {start}"),
        });
    }
    Ok(TimeRange::new(start, end))
}

/// Parses a bounding box string `"west,south,east,north"` into a
/// [`BoundingBox`].
fn parse_bbox(s: &str) -> Result<BoundingBox, ServerError> {
    s.parse().map_err(|e: BoundingBoxError| ServerError::InvalidParameter {
        name: "bbox",
        message: e.to_string(),
    })
}

fn parse_labels(s: &str) -> BTreeSet<String> {
    s.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Mounts the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .route("/map", web::get().to(map_view))
            .route("/trajectories", web::get().to(trajectory_view))
            .route("/destinations", web::get().to(destinations))
            .route("/cache", web::delete().to(invalidate_cache)),
    );
}
