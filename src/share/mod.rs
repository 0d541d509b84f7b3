//! Composer/share flow
//!
//! A selected poster, the account's contact-bar strip, and a watermark
//! are laid out on a fixed-ratio canvas, rasterized through a platform
//! [`Renderer`], and handed to the OS share sheet either as an inline
//! base64 data URI (the Android path) or as a file URI (the iOS path).
//!
//! The flow is a small state machine:
//!
//! ```text
//! Idle -> Composing -> Captured -> Shared | Cancelled | Failed
//! ```
//!
//! Permission denial aborts before capture; capture failures and share
//! dismissal are non-fatal and return the flow to `Idle`. Nothing is
//! retried.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Local;
use std::path::{Path, PathBuf};

use crate::auth::Auth;
use crate::config::ClientOptions;
use crate::error::{AuthErrorKind, Error, ShareErrorKind};
use crate::subscriptions::{entitlement_for, AssetPool, Subscriptions};

/// Canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 1080;
/// Canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 1350;
/// Poster occupies the top portion of the canvas.
pub const POSTER_HEIGHT_RATIO: f32 = 0.75;
/// Contact bar occupies the remainder below the poster.
pub const CONTACT_BAR_HEIGHT_RATIO: f32 = 0.25;
/// Watermark rotation, counter-clockwise.
pub const WATERMARK_ROTATION_DEGREES: f32 = -45.0;
/// Watermark opacity.
pub const WATERMARK_OPACITY: f32 = 0.5;

/// Everything needed to render one share canvas.
///
/// Ephemeral: built immediately before the composer is shown and
/// discarded when the share action completes or is cancelled.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareComposition {
    pub poster_image_url: String,
    pub contact_bar_image_url: String,
    pub watermark_text: String,
    pub category_name: String,
}

/// A placed rectangle on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Watermark placement: centered, rotated, partially transparent.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    pub center_x: u32,
    pub center_y: u32,
    pub rotation_degrees: f32,
    pub opacity: f32,
    pub text: String,
}

/// Resolved canvas geometry for a composition.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasLayout {
    pub width: u32,
    pub height: u32,
    pub poster: Region,
    pub contact_bar: Region,
    pub watermark: WatermarkSpec,
    pub poster_image_url: String,
    pub contact_bar_image_url: String,
}

impl ShareComposition {
    /// Fixed-ratio layout: poster on top, contact bar below, watermark
    /// centered over the seam at half height.
    pub fn layout(&self) -> CanvasLayout {
        let poster_height = (CANVAS_HEIGHT as f32 * POSTER_HEIGHT_RATIO) as u32;
        CanvasLayout {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            poster: Region {
                x: 0,
                y: 0,
                width: CANVAS_WIDTH,
                height: poster_height,
            },
            contact_bar: Region {
                x: 0,
                y: poster_height,
                width: CANVAS_WIDTH,
                height: CANVAS_HEIGHT - poster_height,
            },
            watermark: WatermarkSpec {
                center_x: CANVAS_WIDTH / 2,
                center_y: CANVAS_HEIGHT / 2,
                rotation_degrees: WATERMARK_ROTATION_DEGREES,
                opacity: WATERMARK_OPACITY,
                text: self.watermark_text.clone(),
            },
            poster_image_url: self.poster_image_url.clone(),
            contact_bar_image_url: self.contact_bar_image_url.clone(),
        }
    }
}

/// Flow states; `Shared`, `Cancelled`, and `Failed` are terminal and the
/// flow re-enters `Idle` after reporting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareState {
    Idle,
    Composing,
    Captured,
    Shared,
    Cancelled,
    Failed,
}

/// How the captured bytes are handed to the share sheet.
#[derive(Debug, Clone)]
pub enum ShareTarget {
    /// Inline `data:image/png;base64,…` payload (Android path)
    InlineData,
    /// Write a file and share its `file://` URI (iOS path)
    File(PathBuf),
}

/// Payload presented to the OS share sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum SharePayload {
    InlineData { data_uri: String },
    FileUri { uri: String },
}

/// What the user did with the share sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Completed,
    Dismissed,
}

/// Platform capability: rasterize a composed canvas to PNG bytes.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn capture(&self, layout: &CanvasLayout) -> Result<Vec<u8>, Error>;
}

/// Platform capability: present the OS share sheet.
#[async_trait]
pub trait ShareSheet: Send + Sync {
    async fn present(&self, payload: &SharePayload) -> Result<ShareOutcome, Error>;
}

/// Platform capability: storage permission gate.
///
/// Only the pre-Android-11 path requires a storage permission; other
/// platforms report `false` from `storage_permission_required`.
pub trait PermissionGate: Send + Sync {
    fn storage_permission_required(&self) -> bool;
    fn request_storage_permission(&self) -> bool;
}

/// `file://` URI for a captured file, preserving an existing scheme.
pub fn file_uri(path: &Path) -> String {
    let raw = path.display().to_string();
    if raw.starts_with("file://") {
        raw
    } else {
        format!("file://{}", raw)
    }
}

/// The capture-and-share state machine.
pub struct ShareFlow<'a> {
    renderer: &'a dyn Renderer,
    sheet: &'a dyn ShareSheet,
    permissions: &'a dyn PermissionGate,
    state: ShareState,
    layout: Option<CanvasLayout>,
    captured: Option<Vec<u8>>,
}

impl<'a> ShareFlow<'a> {
    pub fn new(
        renderer: &'a dyn Renderer,
        sheet: &'a dyn ShareSheet,
        permissions: &'a dyn PermissionGate,
    ) -> Self {
        Self {
            renderer,
            sheet,
            permissions,
            state: ShareState::Idle,
            layout: None,
            captured: None,
        }
    }

    pub fn state(&self) -> ShareState {
        self.state
    }

    /// Assemble the canvas. `Idle -> Composing`.
    pub fn compose(&mut self, composition: &ShareComposition) -> Result<(), Error> {
        if self.state != ShareState::Idle {
            return Err(Error::general("share flow is already in progress"));
        }
        self.layout = Some(composition.layout());
        self.state = ShareState::Composing;
        Ok(())
    }

    /// Rasterize the composed canvas. `Composing -> Captured`.
    ///
    /// On the permission-gated platform a denied storage permission
    /// aborts here, before any capture attempt.
    pub async fn capture(&mut self) -> Result<(), Error> {
        let Some(layout) = self.layout.take() else {
            return Err(Error::general("nothing composed to capture"));
        };

        if self.permissions.storage_permission_required()
            && !self.permissions.request_storage_permission()
        {
            self.reset();
            return Err(Error::permission(
                "Storage permission is required to share images.",
            ));
        }

        match self.renderer.capture(&layout).await {
            Ok(bytes) => {
                self.captured = Some(bytes);
                self.state = ShareState::Captured;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "capture failed");
                self.reset();
                Err(Error::share(ShareErrorKind::CaptureFailed, err.to_string()))
            }
        }
    }

    /// Hand the captured bytes to the share sheet. `Captured -> Shared |
    /// Cancelled | Failed`, then back to `Idle`.
    pub async fn share(&mut self, target: ShareTarget) -> Result<ShareState, Error> {
        let Some(bytes) = self.captured.take() else {
            return Err(Error::general("nothing captured to share"));
        };

        let payload = match target {
            ShareTarget::InlineData => SharePayload::InlineData {
                data_uri: format!("data:image/png;base64,{}", BASE64.encode(&bytes)),
            },
            ShareTarget::File(path) => {
                if let Err(err) = tokio::fs::write(&path, &bytes).await {
                    self.reset();
                    return Err(Error::share(ShareErrorKind::CaptureFailed, err.to_string()));
                }
                SharePayload::FileUri {
                    uri: file_uri(&path),
                }
            }
        };

        let result = self.sheet.present(&payload).await;
        self.reset();

        match result {
            Ok(ShareOutcome::Completed) => Ok(ShareState::Shared),
            Ok(ShareOutcome::Dismissed) => Ok(ShareState::Cancelled),
            Err(err) => Err(Error::share(ShareErrorKind::SheetFailed, err.to_string())),
        }
    }

    /// Run the whole flow for one composition.
    pub async fn run(
        &mut self,
        composition: &ShareComposition,
        target: ShareTarget,
    ) -> Result<ShareState, Error> {
        self.compose(composition)?;
        self.capture().await?;
        self.share(target).await
    }

    fn reset(&mut self) {
        self.state = ShareState::Idle;
        self.layout = None;
        self.captured = None;
    }
}

/// Builds a [`ShareComposition`] for a poster click.
///
/// The entitlement decision is made here, at click time: the poster URL
/// is resolved into the paid or promotional pool, and the contact bar is
/// fetched only for entitled categories, falling back to the stock strip
/// and watermark whenever that fetch fails.
pub struct Composer {
    auth: Auth,
    subscriptions: Subscriptions,
    options: ClientOptions,
}

impl Composer {
    pub(crate) fn new(auth: Auth, subscriptions: Subscriptions, options: ClientOptions) -> Self {
        Self {
            auth,
            subscriptions,
            options,
        }
    }

    /// Resolve a composition for a poster in a category.
    pub async fn composition_for(
        &self,
        category_id: i64,
        category_name: &str,
        poster_image_name: &str,
    ) -> Result<ShareComposition, Error> {
        let session = self
            .auth
            .current_session()
            .ok_or_else(|| Error::auth(AuthErrorKind::MissingToken, "no session held"))?;

        let today = Local::now().date_naive();
        let entitled = entitlement_for(&session, category_id, today);
        tracing::debug!(category_id, entitled, "resolving share composition");

        let poster_image_url = self
            .subscriptions
            .poster_url(AssetPool::for_entitled(entitled), poster_image_name);

        let (contact_bar_image_url, watermark_text) = if entitled {
            match self.subscriptions.contact_bar(category_id).await {
                Ok((contact_bar, watermark)) => {
                    (self.subscriptions.contact_bar_url(true, &contact_bar), watermark)
                }
                Err(err) => {
                    // Any failure here degrades to the stock assets; the
                    // share flow itself must not be blocked.
                    tracing::warn!(error = %err, "contact bar fetch failed, using defaults");
                    (
                        self.subscriptions.contact_bar_url(false, ""),
                        self.options.default_watermark.clone(),
                    )
                }
            }
        } else {
            (
                self.subscriptions.contact_bar_url(false, ""),
                self.options.default_watermark.clone(),
            )
        };

        Ok(ShareComposition {
            poster_image_url,
            contact_bar_image_url,
            watermark_text,
            category_name: category_name.to_string(),
        })
    }
}
