//! Shared fork logic for leaf effects.

use crate::cancel::{Cancel, CancelSet};
use crate::cause::{guard, Cause};
use crate::effect::settle::Settle;
use crate::effect::trait_def::{Reject, Resolve};
use crate::runtime::Runtime;

/// Run `body` on the scheduler's next tick.
///
/// The body receives the fork's [`Settle`] and returns its own cancellation
/// handle. A panic inside the body rejects the fork with
/// [`Cause::Panic`]. A panic raised after the fork settled, typically from
/// a downstream callback, cannot be delivered and is resumed instead. The
/// tracing span current at fork time is re-entered while the body runs.
pub(crate) fn dispatch<E, A, B>(
    runtime: &Runtime,
    reject: Reject<E>,
    resolve: Resolve<A>,
    body: B,
) -> Cancel
where
    E: 'static,
    A: 'static,
    B: FnOnce(Settle<E, A>, &Runtime) -> Cancel + 'static,
{
    let settle = Settle::new(reject, resolve);
    let children = CancelSet::default();
    let span = tracing::Span::current();

    let task = {
        let settle = settle.clone();
        let children = children.clone();
        let runtime_handle = runtime.clone();
        runtime.scheduler().asap(Box::new(move || {
            let _entered = span.enter();
            match guard(|| body(settle.clone(), &runtime_handle)) {
                Ok(cancel) => children.push(cancel),
                Err(panic) => {
                    let message = panic.message().to_string();
                    if !settle.fail(Cause::Panic(panic)) {
                        tracing::error!(panic = %message, "panic after the fork settled");
                        std::panic::resume_unwind(Box::new(message));
                    }
                }
            }
        }))
    };
    children.push(task);

    Cancel::new(move || {
        if settle.cancel() {
            children.cancel_all();
        }
    })
}
