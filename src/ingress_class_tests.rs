// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `ingress_class.rs`

use crate::errors::LookupError;
use crate::ingress_class::{is_default_class, should_process, IngressClassLister};
use crate::labels::IS_DEFAULT_INGRESS_CLASS_ANNOTATION;
use k8s_openapi::api::networking::v1::{Ingress, IngressClass, IngressClassSpec, IngressSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::runtime::reflector::{self, Store};
use kube::runtime::watcher::Event;
use std::collections::BTreeMap;
use std::sync::Arc;

const OURS: &str = "zlab.co.jp/nghttpx";
const THEIRS: &str = "k8s.io/ingress-nginx";

fn create_test_class(name: &str, controller: &str, is_default: bool) -> IngressClass {
    let annotations = is_default.then(|| {
        BTreeMap::from([(
            IS_DEFAULT_INGRESS_CLASS_ANNOTATION.to_string(),
            "true".to_string(),
        )])
    });
    IngressClass {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            annotations,
            ..Default::default()
        },
        spec: Some(IngressClassSpec {
            controller: Some(controller.to_string()),
            ..Default::default()
        }),
    }
}

fn create_test_ingress(class_name: Option<&str>) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some("web".to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: class_name.map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn store_of(classes: Vec<IngressClass>) -> Store<IngressClass> {
    let (reader, mut writer) = reflector::store::<IngressClass>();
    for class in classes {
        writer.apply_watcher_event(&Event::Apply(class));
    }
    reader
}

struct UnavailableLister;

impl IngressClassLister for UnavailableLister {
    fn get(&self, name: &str) -> Result<Arc<IngressClass>, LookupError> {
        Err(LookupError::NotFound {
            name: name.to_string(),
        })
    }

    fn list(&self) -> Result<Vec<Arc<IngressClass>>, LookupError> {
        Err(LookupError::Unavailable {
            reason: "cache not synced".to_string(),
        })
    }
}

#[test]
fn test_explicit_class_owned_by_us() {
    let store = store_of(vec![create_test_class("nghttpx", OURS, false)]);
    assert!(should_process(
        &create_test_ingress(Some("nghttpx")),
        OURS,
        &store,
        false
    ));
}

#[test]
fn test_explicit_class_owned_by_other_controller() {
    let store = store_of(vec![create_test_class("nginx", THEIRS, true)]);
    assert!(!should_process(
        &create_test_ingress(Some("nginx")),
        OURS,
        &store,
        false
    ));
}

#[test]
fn test_explicit_class_not_found_fails_closed() {
    let store = store_of(vec![]);
    assert!(!should_process(
        &create_test_ingress(Some("missing")),
        OURS,
        &store,
        false
    ));
}

#[test]
fn test_no_class_when_class_required() {
    let store = store_of(vec![create_test_class("nghttpx", OURS, true)]);
    assert!(!should_process(
        &create_test_ingress(None),
        OURS,
        &store,
        true
    ));
}

#[test]
fn test_no_class_default_is_ours() {
    let store = store_of(vec![
        create_test_class("nginx", THEIRS, false),
        create_test_class("nghttpx", OURS, true),
    ]);
    assert!(should_process(
        &create_test_ingress(None),
        OURS,
        &store,
        false
    ));
}

#[test]
fn test_no_class_default_is_theirs() {
    let store = store_of(vec![
        create_test_class("nginx", THEIRS, true),
        create_test_class("nghttpx", OURS, false),
    ]);
    assert!(!should_process(
        &create_test_ingress(None),
        OURS,
        &store,
        false
    ));
}

#[test]
fn test_no_class_and_no_default_is_processed() {
    let store = store_of(vec![create_test_class("nginx", THEIRS, false)]);
    assert!(should_process(
        &create_test_ingress(None),
        OURS,
        &store,
        false
    ));

    let empty = store_of(vec![]);
    assert!(should_process(
        &Ingress::default(),
        OURS,
        &empty,
        false
    ));
}

#[test]
fn test_list_failure_fails_closed() {
    assert!(!should_process(
        &create_test_ingress(None),
        OURS,
        &UnavailableLister,
        false
    ));
    assert!(!should_process(
        &create_test_ingress(Some("nghttpx")),
        OURS,
        &UnavailableLister,
        false
    ));
}

#[test]
fn test_is_default_class_requires_true() {
    assert!(is_default_class(&create_test_class("a", OURS, true)));
    assert!(!is_default_class(&create_test_class("a", OURS, false)));

    let mut class = create_test_class("a", OURS, false);
    class.metadata.annotations = Some(BTreeMap::from([(
        IS_DEFAULT_INGRESS_CLASS_ANNOTATION.to_string(),
        "yes".to_string(),
    )]));
    assert!(!is_default_class(&class));
}
