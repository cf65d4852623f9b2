// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android script channel via JNI.
//
// The Java side owns the WebView and provides an object with
//
//     void evaluate(String script, String evalId)
//
// which runs `script` on the UI thread. When `evalId` is non-null the host
// reports the script's result back through `nativeOnEvaluateResult`.
// Messages the page posts under `kamomeSend` are forwarded through
// `nativeReceive`. The Java glue lives in `jp.hituzi.kamome.NativeBridge`.

#![cfg(target_os = "android")]

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;

use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::jlong;
use jni::{JNIEnv, JavaVM};
use tracing::{info, warn};

use kamome_core::config::BridgeConfig;
use kamome_core::error::{BridgeError, Result};

use crate::client::Client;
use crate::results::ResultTable;
use crate::traits::{EvalCallback, ScriptChannel};

const EVALUATE_SIG: &str = "(Ljava/lang/String;Ljava/lang/String;)V";

fn jni_err(context: &str, e: jni::errors::Error) -> BridgeError {
    BridgeError::Channel(format!("{context}: {e}"))
}

/// Script channel backed by a Java object's `evaluate(String, String)`.
pub struct AndroidChannel {
    vm: JavaVM,
    target: GlobalRef,
    results: ResultTable,
}

impl AndroidChannel {
    pub fn new(env: &mut JNIEnv, target: &JObject) -> Result<Self> {
        let vm = env.get_java_vm().map_err(|e| jni_err("get_java_vm", e))?;
        let target = env
            .new_global_ref(target)
            .map_err(|e| jni_err("new_global_ref", e))?;
        Ok(Self {
            vm,
            target,
            results: ResultTable::new(),
        })
    }

    pub fn results(&self) -> &ResultTable {
        &self.results
    }

    fn call_evaluate(&self, script: &str, eval_id: Option<u64>) -> Result<()> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| jni_err("attach_current_thread", e))?;

        let j_script = env
            .new_string(script)
            .map_err(|e| jni_err("new_string(script)", e))?;
        let j_id = match eval_id {
            Some(id) => JObject::from(
                env.new_string(id.to_string())
                    .map_err(|e| jni_err("new_string(evalId)", e))?,
            ),
            None => JObject::null(),
        };

        env.call_method(
            &self.target,
            "evaluate",
            EVALUATE_SIG,
            &[JValue::Object(&j_script), JValue::Object(&j_id)],
        )
        .map_err(|e| jni_err("evaluate", e))?;
        Ok(())
    }
}

impl ScriptChannel for AndroidChannel {
    fn evaluate(&self, script: String) {
        if let Err(e) = self.call_evaluate(&script, None) {
            warn!(error = %e, "failed to evaluate script in WebView");
        }
    }

    fn evaluate_with_result(&self, script: String, on_result: EvalCallback) -> Result<()> {
        let id = self.results.register(on_result);
        if let Err(e) = self.call_evaluate(&script, Some(id)) {
            self.results.complete(id, None);
            return Err(e);
        }
        Ok(())
    }
}

/// Native state behind the `jlong` handle held by `NativeBridge`.
pub struct AndroidHost {
    // Declared before the runtime so the client's retry task is aborted
    // while the runtime is still alive.
    client: Client,
    channel: std::sync::Arc<AndroidChannel>,
    _runtime: tokio::runtime::Runtime,
}

impl AndroidHost {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn channel(&self) -> &AndroidChannel {
        &self.channel
    }
}

type HostSetup = fn(&Client);

static HOST_SETUP: OnceLock<HostSetup> = OnceLock::new();

/// Register the function that adds the application's commands to every
/// client created from Java. Only the first registration takes effect.
pub fn set_host_setup(setup: HostSetup) -> bool {
    HOST_SETUP.set(setup).is_ok()
}

fn create_host(env: &mut JNIEnv, target: &JObject) -> Result<AndroidHost> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .thread_name("kamome-bridge")
        .build()?;
    let channel = std::sync::Arc::new(AndroidChannel::new(env, target)?);
    let client = Client::with_runtime(
        channel.clone(),
        BridgeConfig::default(),
        runtime.handle().clone(),
    )?;

    if let Some(setup) = HOST_SETUP.get() {
        setup(&client);
    }
    info!("Android bridge host created");

    Ok(AndroidHost {
        client,
        channel,
        _runtime: runtime,
    })
}

/// # Safety
///
/// `handle` must come from `nativeCreate` and not have been released.
unsafe fn host<'a>(handle: jlong) -> Option<&'a AndroidHost> {
    // SAFETY: upheld by the caller.
    unsafe { (handle as *const AndroidHost).as_ref() }
}

fn read_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    if value.is_null() {
        return None;
    }
    env.get_string(value).ok().map(Into::into)
}

fn throw(env: &mut JNIEnv, message: &str) {
    if let Err(e) = env.throw_new("java/lang/IllegalStateException", message) {
        warn!(error = %e, "failed to raise Java exception");
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_jp_hituzi_kamome_NativeBridge_nativeCreate<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    target: JObject<'local>,
) -> jlong {
    match create_host(&mut env, &target) {
        Ok(host) => Box::into_raw(Box::new(host)) as jlong,
        Err(e) => {
            throw(&mut env, &e.to_string());
            0
        }
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_jp_hituzi_kamome_NativeBridge_nativeReceive<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    message: JString<'local>,
) {
    // SAFETY: the Java side passes the handle returned by `nativeCreate`.
    let Some(host) = (unsafe { host(handle) }) else {
        return;
    };
    let Some(message) = read_string(&mut env, &message) else {
        warn!("null message from page");
        return;
    };

    // The exception policy panics on unknown commands; surface that to Java
    // instead of unwinding across the FFI boundary.
    let outcome = catch_unwind(AssertUnwindSafe(|| host.client.receive(&message)));
    if let Err(panic) = outcome {
        let reason = panic
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "bridge panicked".into());
        throw(&mut env, &reason);
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_jp_hituzi_kamome_NativeBridge_nativeOnEvaluateResult<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    eval_id: JString<'local>,
    result: JString<'local>,
) {
    // SAFETY: the Java side passes the handle returned by `nativeCreate`.
    let Some(host) = (unsafe { host(handle) }) else {
        return;
    };
    let Some(id) = read_string(&mut env, &eval_id).and_then(|s| s.parse::<u64>().ok()) else {
        warn!("evaluation result without a valid id");
        return;
    };
    let result = read_string(&mut env, &result);
    host.channel.results().complete(id, result);
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_jp_hituzi_kamome_NativeBridge_nativeRelease<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
) {
    if handle == 0 {
        return;
    }
    // SAFETY: `handle` came from `Box::into_raw` in `nativeCreate` and the
    // Java side releases it exactly once.
    let host = unsafe { Box::from_raw(handle as *mut AndroidHost) };
    host.channel.results().abandon_all();
    drop(host);
}
