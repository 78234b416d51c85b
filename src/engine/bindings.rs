//! Script bindings
//!
//! Registers every [`PredicateLibrary`] function as a global of the
//! interpreter under its PAC name. The globals are plain function pointers;
//! the library they act on is the one installed for the current thread by
//! [`LibraryScope`] while an evaluation runs.

use boa_engine::{Context, JsNativeError, JsResult, JsString, JsValue, NativeFunction};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

use crate::error::PacError;
use crate::predicates::{self, PredicateLibrary, ScriptArg};

type Binding = fn(&PredicateLibrary, &[JsValue], &mut Context) -> JsResult<JsValue>;

/// Name, declared arity and implementation of each global
const BINDINGS: &[(&str, usize, Binding)] = &[
    ("isPlainHostName", 1, is_plain_host_name),
    ("dnsDomainIs", 2, dns_domain_is),
    ("localHostOrDomainIs", 2, local_host_or_domain_is),
    ("isResolvable", 1, is_resolvable),
    ("isResolvableEx", 1, is_resolvable_ex),
    ("isInNet", 3, is_in_net),
    ("isInNetEx", 2, is_in_net_ex),
    ("dnsResolve", 1, dns_resolve),
    ("dnsResolveEx", 1, dns_resolve_ex),
    ("myIpAddress", 0, my_ip_address),
    ("myIpAddressEx", 0, my_ip_address_ex),
    ("dnsDomainLevels", 1, dns_domain_levels),
    ("shExpMatch", 2, sh_exp_match),
    ("weekdayRange", 3, weekday_range),
    ("dateRange", 7, date_range),
    ("timeRange", 7, time_range),
    ("sortIpAddressList", 1, sort_ip_address_list),
    ("getClientVersion", 0, get_client_version),
    ("alert", 1, alert),
];

/// Names bound into every script context
pub fn global_names() -> impl Iterator<Item = &'static str> {
    BINDINGS.iter().map(|(name, _, _)| *name)
}

thread_local! {
    static ACTIVE_LIBRARY: RefCell<Option<Rc<PredicateLibrary>>> = const { RefCell::new(None) };
}

/// Makes a library visible to the bindings on this thread until dropped.
///
/// Scopes nest: dropping one restores whatever library was active before.
pub struct LibraryScope {
    previous: Option<Rc<PredicateLibrary>>,
}

impl LibraryScope {
    pub fn enter(library: &Rc<PredicateLibrary>) -> Self {
        let previous = ACTIVE_LIBRARY.with(|active| active.replace(Some(Rc::clone(library))));
        Self { previous }
    }
}

impl Drop for LibraryScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_LIBRARY.with(|active| active.replace(previous));
    }
}

pub fn register_all(context: &mut Context) -> JsResult<()> {
    for &(name, length, binding) in BINDINGS {
        let function = NativeFunction::from_copy_closure(move |_this, args, context| {
            dispatch(binding, args, context)
        });
        context.register_global_callable(JsString::from(name), length, function)?;
    }
    Ok(())
}

fn dispatch(binding: Binding, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    // Clone out of the cell so nested script calls can re-enter.
    let library = ACTIVE_LIBRARY
        .with(|active| active.borrow().clone())
        .ok_or_else(|| JsNativeError::typ().with_message("PAC functions called outside an evaluation"))?;
    binding(&library, args, context)
}

fn string_arg(args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(optional_string_arg(args, index, context)?.unwrap_or_default())
}

fn optional_string_arg(
    args: &[JsValue],
    index: usize,
    context: &mut Context,
) -> JsResult<Option<String>> {
    match args.get(index) {
        Some(value) if !value.is_undefined() && !value.is_null() => {
            Ok(Some(value.to_string(context)?.to_std_string_escaped()))
        }
        _ => Ok(None),
    }
}

fn script_args(args: &[JsValue]) -> Vec<ScriptArg> {
    args.iter()
        .map(|value| {
            if let Some(number) = value.as_number() {
                ScriptArg::Number(number)
            } else if let Some(text) = value.as_string() {
                ScriptArg::Text(text.to_std_string_escaped())
            } else {
                ScriptArg::Missing
            }
        })
        .collect()
}

fn text_value(text: &str) -> JsValue {
    JsValue::from(JsString::from(text))
}

fn type_error(error: PacError) -> boa_engine::JsError {
    JsNativeError::typ().with_message(error.to_string()).into()
}

fn is_plain_host_name(_: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    Ok(predicates::is_plain_host_name(&host).into())
}

fn dns_domain_is(_: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    let domain = string_arg(args, 1, context)?;
    Ok(predicates::dns_domain_is(&host, &domain).into())
}

fn local_host_or_domain_is(_: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    let domain = string_arg(args, 1, context)?;
    Ok(predicates::local_host_or_domain_is(&host, &domain).into())
}

fn is_resolvable(library: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    Ok(library.is_resolvable(&host).into())
}

fn is_resolvable_ex(library: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    Ok(library.is_resolvable_ex(&host).into())
}

fn is_in_net(library: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    let pattern = string_arg(args, 1, context)?;
    let mask = string_arg(args, 2, context)?;
    Ok(library.is_in_net(&host, &pattern, &mask).into())
}

fn is_in_net_ex(library: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let address = string_arg(args, 0, context)?;
    let prefix = string_arg(args, 1, context)?;
    Ok(library.is_in_net_ex(&address, &prefix).into())
}

fn dns_resolve(library: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    Ok(text_value(&library.dns_resolve(&host)))
}

fn dns_resolve_ex(library: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    Ok(text_value(&library.dns_resolve_ex(&host)))
}

fn my_ip_address(library: &PredicateLibrary, _: &[JsValue], _: &mut Context) -> JsResult<JsValue> {
    Ok(text_value(&library.my_ip_address()))
}

fn my_ip_address_ex(library: &PredicateLibrary, _: &[JsValue], _: &mut Context) -> JsResult<JsValue> {
    Ok(text_value(&library.my_ip_address_ex()))
}

fn dns_domain_levels(_: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    let levels = i32::try_from(predicates::dns_domain_levels(&host)).unwrap_or(i32::MAX);
    Ok(JsValue::from(levels))
}

fn sh_exp_match(_: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let text = string_arg(args, 0, context)?;
    let pattern = string_arg(args, 1, context)?;
    Ok(predicates::sh_exp_match(&text, &pattern).into())
}

fn weekday_range(library: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let day1 = string_arg(args, 0, context)?;
    let day2 = optional_string_arg(args, 1, context)?;
    let gmt = optional_string_arg(args, 2, context)?;
    Ok(library
        .weekday_range(&day1, day2.as_deref(), gmt.as_deref())
        .into())
}

fn date_range(library: &PredicateLibrary, args: &[JsValue], _: &mut Context) -> JsResult<JsValue> {
    Ok(library.date_range(&script_args(args)).into())
}

fn time_range(library: &PredicateLibrary, args: &[JsValue], _: &mut Context) -> JsResult<JsValue> {
    library
        .time_range(&script_args(args))
        .map(JsValue::from)
        .map_err(type_error)
}

fn sort_ip_address_list(library: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = string_arg(args, 0, context)?;
    Ok(text_value(&library.sort_ip_address_list(&list)))
}

fn get_client_version(library: &PredicateLibrary, _: &[JsValue], _: &mut Context) -> JsResult<JsValue> {
    Ok(text_value(library.client_version()))
}

fn alert(_: &PredicateLibrary, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let message = string_arg(args, 0, context)?;
    info!(target: "pac_script", "{}", message);
    Ok(JsValue::undefined())
}
