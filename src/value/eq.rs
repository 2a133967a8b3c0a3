//! Сравнение и отладочный вывод для графов значений.
//!
//! Производные `PartialEq`/`Debug` ушли бы в бесконечную рекурсию на
//! циклическом графе, поэтому оба реализованы вручную с отслеживанием уже
//! посещённых объектов.

use std::{collections::HashMap, fmt};

use super::{Value, MAX_SAFE_INTEGER, MIN_SAFE_INTEGER};

/// Структурное сравнение двух графов.
///
/// Помимо содержимого сравнивается форма разделения: если в `a` один объект
/// встречается в двух местах, в `b` на этих местах тоже должен быть один
/// объект. Циклы поддерживаются.
///
/// Равенство совпадает с равенством байтов на проводе, а значит и хеша:
/// числа с плавающей точкой сравниваются побитово (`NaN == NaN`,
/// `0.0 != -0.0`), а `Int(n)` равен `BigInt(n)` только вне безопасного
/// диапазона, где оба пишутся как BIGINT.
pub fn deep_eq(
    a: &Value,
    b: &Value,
) -> bool {
    GraphEq::default().eq(a, b)
}

#[derive(Default)]
struct GraphEq {
    forward: HashMap<usize, usize>,
    backward: HashMap<usize, usize>,
}

impl GraphEq {
    fn eq(
        &mut self,
        a: &Value,
        b: &Value,
    ) -> bool {
        if let (Some(ia), Some(ib)) = (a.identity(), b.identity()) {
            match (self.forward.get(&ia), self.backward.get(&ib)) {
                (Some(&fa), Some(&fb)) => return fa == ib && fb == ia,
                (None, None) => {
                    self.forward.insert(ia, ib);
                    self.backward.insert(ib, ia);
                }
                _ => return false,
            }
        }

        match (a, b) {
            (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::BigInt(x), Value::BigInt(y)) => x == y,
            // Int вне безопасного диапазона пишется как BIGINT.
            (Value::Int(x), Value::BigInt(y)) | (Value::BigInt(y), Value::Int(x)) => {
                !(MIN_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(x) && *x as i128 == *y
            }
            (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::Bytes(x), Value::Bytes(y)) => x == y,
            (Value::Array(x), Value::Array(y)) | (Value::Set(x), Value::Set(y)) => {
                let (x, y) = (x.borrow(), y.borrow());
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| self.eq(p, q))
            }
            (Value::Map(x), Value::Map(y)) => {
                let (x, y) = (x.borrow(), y.borrow());
                x.len() == y.len()
                    && x
                        .iter()
                        .zip(y.iter())
                        .all(|((ka, va), (kb, vb))| self.eq(ka, kb) && self.eq(va, vb))
            }
            (Value::Object(x), Value::Object(y)) => {
                let (x, y) = (x.borrow(), y.borrow());
                x.len() == y.len()
                    && x
                        .iter()
                        .zip(y.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && self.eq(va, vb))
            }
            (Value::Date(x), Value::Date(y)) => x.millis.to_bits() == y.millis.to_bits(),
            (Value::RegExp(x), Value::RegExp(y)) => x == y,
            (Value::Error(x), Value::Error(y)) => x == y,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        deep_eq(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        DebugGraph {
            value: self,
            ancestors: &mut Vec::new(),
        }
        .write(f)
    }
}

struct DebugGraph<'a, 'b> {
    value: &'a Value,
    ancestors: &'b mut Vec<usize>,
}

impl DebugGraph<'_, '_> {
    fn write(
        self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let id = self.value.identity();
        if let Some(id) = id {
            if self.ancestors.contains(&id) {
                return f.write_str("[Circular]");
            }
            self.ancestors.push(id);
        }

        let res = match self.value {
            Value::Null => f.write_str("Null"),
            Value::Undefined => f.write_str("Undefined"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::BigInt(i) => write!(f, "BigInt({i})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Value::Array(items) | Value::Set(items) => {
                let tag = if matches!(self.value, Value::Array(_)) {
                    "Array"
                } else {
                    "Set"
                };
                write!(f, "{tag}[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    DebugGraph {
                        value: item,
                        ancestors: &mut *self.ancestors,
                    }
                    .write(f)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("Map{")?;
                for (i, (k, v)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    DebugGraph {
                        value: k,
                        ancestors: &mut *self.ancestors,
                    }
                    .write(f)?;
                    f.write_str(" => ")?;
                    DebugGraph {
                        value: v,
                        ancestors: &mut *self.ancestors,
                    }
                    .write(f)?;
                }
                f.write_str("}")
            }
            Value::Object(entries) => {
                f.write_str("Object{")?;
                for (i, (k, v)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k:?}: ")?;
                    DebugGraph {
                        value: v,
                        ancestors: &mut *self.ancestors,
                    }
                    .write(f)?;
                }
                f.write_str("}")
            }
            Value::Date(d) => write!(f, "Date({:?})", d.millis),
            Value::RegExp(r) => write!(f, "RegExp(/{}/{})", r.source, r.flags),
            Value::Error(e) => write!(f, "Error({}: {})", e.name, e.message),
        };

        if id.is_some() {
            self.ancestors.pop();
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что два независимо построенных цикла равны.
    #[test]
    fn test_cycles_compare_equal() {
        let a = Value::object([("n", Value::Int(1))]);
        a.insert("self", a.clone());
        let b = Value::object([("n", Value::Int(1))]);
        b.insert("self", b.clone());

        assert_eq!(a, b);
    }

    /// Тест проверяет, что разделяемый объект не равен двум копиям.
    #[test]
    fn test_sharing_shape_matters() {
        let shared = Value::array(vec![Value::Int(1)]);
        let with_sharing = Value::array(vec![shared.clone(), shared]);
        let with_copies = Value::array(vec![
            Value::array(vec![Value::Int(1)]),
            Value::array(vec![Value::Int(1)]),
        ]);

        assert_ne!(with_sharing, with_copies);
        assert_eq!(with_sharing, with_sharing.clone());
    }

    /// Тест проверяет числовые правила: побитовое сравнение float и
    /// равенство Int/BigInt только там, где оба пишутся как BIGINT.
    #[test]
    fn test_numeric_rules() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_ne!(Value::date(0.0), Value::date(-0.0));
        assert_ne!(Value::Int(5), Value::BigInt(5));
        assert_ne!(Value::Int(MAX_SAFE_INTEGER), Value::BigInt(MAX_SAFE_INTEGER as i128));
        assert_eq!(
            Value::Int(MAX_SAFE_INTEGER + 1),
            Value::BigInt(MAX_SAFE_INTEGER as i128 + 1)
        );
        assert_eq!(Value::BigInt(i64::MIN as i128), Value::Int(i64::MIN));
        assert_ne!(Value::Int(5), Value::Float(5.0));
    }

    /// Тест проверяет, что Debug не зацикливается на самоссылке.
    #[test]
    fn test_debug_circular() {
        let a = Value::array(Vec::new());
        a.push(a.clone());
        assert_eq!(format!("{a:?}"), "Array[[Circular]]");
    }
}
