//! Shape and contract checks, run before any kernel invocation
use crate::{
    Error,
    buffer::{Buffer, Role, Time},
    element::Element,
    error::Dims,
    kernel::Signature,
    precision,
};

/// Evaluation mode, resolved from the dimensionality of the inputs
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    /// One point; every buffer is 1D
    Single,
    /// `N` points; inputs, outputs, and parameters are 2D
    Batch(usize),
}

impl Mode {
    fn ndim(&self) -> usize {
        match self {
            Mode::Single => 1,
            Mode::Batch(..) => 2,
        }
    }
}

/// Checks a set of caller buffers against a kernel signature
///
/// Checks are performed in a fixed order and the first failure is returned.
/// A missing `outputs` buffer is not an error (it will be allocated).
pub(crate) fn validate<T: Element>(
    sig: &Signature,
    prec: u32,
    inputs: &Buffer<'_, T>,
    outputs: Option<&Buffer<'_, T>>,
    pars: Option<&Buffer<'_, T>>,
    time: Option<&Time<'_, T>>,
) -> Result<Mode, Error> {
    if sig.nparams > 0 && pars.is_none() {
        return Err(Error::MissingParameters(sig.nparams));
    }
    if sig.is_time_dependent && time.is_none() {
        return Err(Error::MissingTime);
    }

    let mode = match inputs.ndim() {
        1 => Mode::Single,
        2 => Mode::Batch(inputs.dim(1)),
        actual => {
            return Err(Error::InvalidDimensionality {
                role: Role::Inputs,
                actual,
                expected: Dims::OneOrTwo,
            });
        }
    };
    check_first_dim(inputs, Role::Inputs, sig.nvars)?;

    match (mode, time) {
        (Mode::Single, Some(Time::Array(..))) => {
            return Err(Error::ScalarTimeExpected);
        }
        (Mode::Batch(..), Some(Time::Scalar(..))) => {
            return Err(Error::TimeArrayExpected);
        }
        _ => (),
    }

    if let Some(out) = outputs {
        if !out.is_writable() {
            return Err(Error::NonWritableOutput);
        }
        check_shape(out, Role::Outputs, sig.nouts, mode)?;
    }
    if let Some(pars) = pars {
        check_shape(pars, Role::Parameters, sig.nparams, mode)?;
    }

    let time = time.map(Time::buffer);
    if let Some(t) = &time {
        if t.ndim() != 1 {
            return Err(Error::InvalidDimensionality {
                role: Role::Time,
                actual: t.ndim(),
                expected: Dims::Exactly(1),
            });
        }
        if let Mode::Batch(n) = mode {
            if t.dim(0) != n {
                return Err(Error::BatchSizeMismatch {
                    role: Role::Time,
                    actual: t.dim(0),
                    expected: n,
                });
            }
        }
    }

    precision::check(inputs, Role::Inputs, prec)?;
    if let Some(pars) = pars {
        precision::check(pars, Role::Parameters, prec)?;
    }
    if let Some(t) = &time {
        precision::check(t, Role::Time, prec)?;
    }

    Ok(mode)
}

fn check_first_dim<T>(
    buf: &Buffer<'_, T>,
    role: Role,
    expected: u32,
) -> Result<(), Error> {
    if buf.dim(0) != expected as usize {
        Err(Error::SizeMismatch {
            role,
            actual: buf.dim(0),
            expected: expected as usize,
        })
    } else {
        Ok(())
    }
}

fn check_shape<T>(
    buf: &Buffer<'_, T>,
    role: Role,
    expected: u32,
    mode: Mode,
) -> Result<(), Error> {
    if buf.ndim() != mode.ndim() {
        return Err(Error::InvalidDimensionality {
            role,
            actual: buf.ndim(),
            expected: Dims::Exactly(mode.ndim()),
        });
    }
    check_first_dim(buf, role, expected)?;
    if let Mode::Batch(n) = mode {
        if buf.dim(1) != n {
            return Err(Error::BatchSizeMismatch {
                role,
                actual: buf.dim(1),
                expected: n,
            });
        }
    }
    Ok(())
}
