//! Known overlays

use std::collections::HashSet;
use std::sync::Arc;

use devflow_core_types::Selector;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::PopupError;

pub const PROMO_POPUP: &str = "promo";
pub const TUTORIAL_POPUP: &str = "tutorial";

const APP_ID_PREFIX: &str = "com.pure.indosat.care:id/";

fn default_max_next_steps() -> u32 {
    5
}

fn default_skip_all() -> Selector {
    Selector::text("Skip All")
}

/// How an overlay is dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PopupKind {
    /// Close control, then its center, then the default position
    #[default]
    Generic,

    /// Multi-page walkthrough with Skip / Next controls
    Tutorial {
        next: Selector,

        #[serde(default = "default_skip_all")]
        skip_all: Selector,

        #[serde(default = "default_max_next_steps")]
        max_next_steps: u32,
    },
}

/// One known overlay.
///
/// For tutorials `dismiss` is the Skip control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupDefinition {
    pub name: String,
    pub container: Selector,
    pub dismiss: Selector,

    #[serde(default)]
    pub alternates: Vec<Selector>,

    /// Lower is checked first
    pub priority: i32,

    #[serde(default)]
    pub kind: PopupKind,
}

impl PopupDefinition {
    pub fn generic(name: impl Into<String>, container: Selector, dismiss: Selector, priority: i32) -> Self {
        Self {
            name: name.into(),
            container,
            dismiss,
            alternates: Vec::new(),
            priority,
            kind: PopupKind::Generic,
        }
    }

    pub fn with_alternate(mut self, selector: Selector) -> Self {
        self.alternates.push(selector);
        self
    }

    pub fn with_kind(mut self, kind: PopupKind) -> Self {
        self.kind = kind;
        self
    }

    /// Dismissal selectors, primary first.
    pub fn dismissal_selectors(&self) -> impl Iterator<Item = &Selector> {
        std::iter::once(&self.dismiss).chain(self.alternates.iter())
    }

    fn validate(&self) -> Result<(), PopupError> {
        let empty = |field: &'static str| PopupError::EmptySelector {
            popup: self.name.clone(),
            field,
        };
        self.container.validate().map_err(|_| empty("container"))?;
        self.dismiss.validate().map_err(|_| empty("dismiss"))?;
        for alternate in &self.alternates {
            alternate.validate().map_err(|_| empty("alternate"))?;
        }
        if let PopupKind::Tutorial { next, skip_all, .. } = &self.kind {
            next.validate().map_err(|_| empty("next"))?;
            skip_all.validate().map_err(|_| empty("skip_all"))?;
        }
        Ok(())
    }
}

static BUILTIN: Lazy<Arc<PopupCatalog>> = Lazy::new(|| Arc::new(PopupCatalog::builtin()));

/// Priority-ordered, read-only set of known overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupCatalog {
    popups: Vec<PopupDefinition>,
}

impl PopupCatalog {
    pub fn new(mut popups: Vec<PopupDefinition>) -> Result<Self, PopupError> {
        let mut names = HashSet::new();
        for popup in &popups {
            popup.validate()?;
            if !names.insert(popup.name.clone()) {
                return Err(PopupError::DuplicateName(popup.name.clone()));
            }
        }
        popups.sort_by_key(|popup| popup.priority);
        Ok(Self { popups })
    }

    /// The overlays the host app is known to show.
    pub fn builtin() -> Self {
        let promo = PopupDefinition::generic(
            PROMO_POPUP,
            Selector::id(format!("{APP_ID_PREFIX}inapp_html_full_relative_layout"))
                .with_label("promo overlay"),
            Selector::id("button-2").with_label("promo close"),
            1,
        );

        let tutorial = PopupDefinition::generic(
            TUTORIAL_POPUP,
            Selector::id(format!("{APP_ID_PREFIX}skip_layout")).with_label("tutorial overlay"),
            Selector::id(format!("{APP_ID_PREFIX}tvSkip")).with_label("tutorial skip"),
            2,
        )
        .with_kind(PopupKind::Tutorial {
            next: Selector::id(format!("{APP_ID_PREFIX}tvNext")).with_label("tutorial next"),
            skip_all: default_skip_all(),
            max_next_steps: default_max_next_steps(),
        });

        Self {
            popups: vec![promo, tutorial],
        }
    }

    /// Process-wide shared copy of [`PopupCatalog::builtin`].
    pub fn shared_builtin() -> Arc<PopupCatalog> {
        Arc::clone(&BUILTIN)
    }

    pub fn get(&self, name: &str) -> Option<&PopupDefinition> {
        self.popups.iter().find(|popup| popup.name == name)
    }

    /// Definitions in ascending priority order.
    pub fn iter(&self) -> impl Iterator<Item = &PopupDefinition> {
        self.popups.iter()
    }

    pub fn definitions(&self) -> &[PopupDefinition] {
        &self.popups
    }

    pub fn len(&self) -> usize {
        self.popups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.popups.is_empty()
    }
}

impl Default for PopupCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
