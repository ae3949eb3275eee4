// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `IngressClass` ownership checks.
//!
//! Decides per Ingress whether this controller instance is responsible for it:
//!
//! 1. An explicit `spec.ingressClassName` must resolve to a class whose
//!    `spec.controller` is ours. Lookup failures fail closed.
//! 2. Without an explicit class, nothing is processed when an explicit class
//!    is required by policy.
//! 3. Otherwise the cluster default class decides, if there is one.
//! 4. With no default class at all, the Ingress is processed.

use std::sync::Arc;

use k8s_openapi::api::networking::v1::{Ingress, IngressClass};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;
use tracing::{debug, error};

use crate::errors::LookupError;
use crate::labels::IS_DEFAULT_INGRESS_CLASS_ANNOTATION;

/// Read access to `IngressClass` objects.
pub trait IngressClassLister {
    /// Returns the class called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] if there is no such class.
    fn get(&self, name: &str) -> Result<Arc<IngressClass>, LookupError>;

    /// Returns every known class.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Unavailable`] if the classes cannot be listed.
    fn list(&self) -> Result<Vec<Arc<IngressClass>>, LookupError>;
}

impl IngressClassLister for Store<IngressClass> {
    fn get(&self, name: &str) -> Result<Arc<IngressClass>, LookupError> {
        Store::get(self, &ObjectRef::new(name)).ok_or_else(|| LookupError::NotFound {
            name: name.to_string(),
        })
    }

    fn list(&self) -> Result<Vec<Arc<IngressClass>>, LookupError> {
        Ok(self.state())
    }
}

/// True if `class` carries the cluster default marker.
#[must_use]
pub fn is_default_class(class: &IngressClass) -> bool {
    class
        .annotations()
        .get(IS_DEFAULT_INGRESS_CLASS_ANNOTATION)
        .is_some_and(|v| v == "true")
}

fn controller_of(class: &IngressClass) -> &str {
    class
        .spec
        .as_ref()
        .and_then(|s| s.controller.as_deref())
        .unwrap_or_default()
}

/// Checks whether this controller should process `ingress`.
pub fn should_process<L: IngressClassLister + ?Sized>(
    ingress: &Ingress,
    controller_id: &str,
    lister: &L,
    require_ingress_class: bool,
) -> bool {
    let class_name = ingress
        .spec
        .as_ref()
        .and_then(|s| s.ingress_class_name.as_deref());

    if let Some(class_name) = class_name {
        let class = match lister.get(class_name) {
            Ok(class) => class,
            Err(e) => {
                error!("Could not get IngressClass {}: {}", class_name, e);
                return false;
            }
        };

        if controller_of(&class) != controller_id {
            debug!(
                "Skip Ingress {}/{} which needs IngressClass {} controller {}",
                ingress.namespace().unwrap_or_default(),
                ingress.name_any(),
                class.name_any(),
                controller_of(&class)
            );
            return false;
        }

        return true;
    }

    if require_ingress_class {
        return false;
    }

    let classes = match lister.list() {
        Ok(classes) => classes,
        Err(e) => {
            error!("Could not list IngressClass: {}", e);
            return false;
        }
    };

    if let Some(default_class) = classes.iter().find(|c| is_default_class(c)) {
        if controller_of(default_class) != controller_id {
            debug!(
                "Skip Ingress {}/{} because it defaults to IngressClass {} controller {}",
                ingress.namespace().unwrap_or_default(),
                ingress.name_any(),
                default_class.name_any(),
                controller_of(default_class)
            );
            return false;
        }
        return true;
    }

    // No default IngressClass: process the Ingress
    true
}

#[cfg(test)]
#[path = "ingress_class_tests.rs"]
mod ingress_class_tests;
