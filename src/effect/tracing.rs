//! Span instrumentation for effects.

use crate::cancel::Cancel;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// An effect wrapped in a tracing span.
///
/// The span is entered while the node forks its child, so leaves forked
/// underneath capture it and re-enter it when their bodies run. The
/// reject and resolve callbacks run inside the span as well.
///
/// Created by [`EffectExt::instrument`](crate::EffectExt::instrument).
#[derive(Debug)]
pub struct Instrument<Inner> {
    pub(crate) inner: Inner,
    pub(crate) span: tracing::Span,
}

impl<Inner: Effect> Effect for Instrument<Inner> {
    type Output = Inner::Output;
    type Error = Inner::Error;
    type Env = Inner::Env;

    fn fork(
        &self,
        env: Self::Env,
        reject: Reject<Self::Error>,
        resolve: Resolve<Self::Output>,
        runtime: &Runtime,
    ) -> Cancel {
        let on_reject = {
            let span = self.span.clone();
            Box::new(move |cause| span.in_scope(|| reject(cause)))
        };
        let on_resolve = {
            let span = self.span.clone();
            Box::new(move |value| span.in_scope(|| resolve(value)))
        };
        let _entered = self.span.enter();
        self.inner.fork(env, on_reject, on_resolve, runtime)
    }
}
