use std::{cell::RefCell, rc::Rc};

/// Разделяемый изменяемый контейнер.
///
/// Контейнеры хранятся за `Rc`, чтобы один и тот же объект мог встречаться
/// в графе несколько раз (и ссылаться сам на себя). `RefCell` нужен
/// декодеру: плейсхолдер регистрируется в таблице ссылок до того, как
/// прочитаны его дети.
pub type Shared<T> = Rc<RefCell<T>>;

/// Максимальное целое, которое double представляет без потерь (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;
/// Минимальное целое, которое double представляет без потерь.
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

/// Значение, которое умеет кодировать RSER.
///
/// Скалярные варианты хранятся по значению. Варианты, способные участвовать
/// в ссылках (`Array`, `Map`, `Set`, `Object`, `Date`, `RegExp`, `Error`),
/// хранятся за `Rc`: идентичность объекта — адрес его аллокации. Клонирование
/// такого `Value` даёт вторую ссылку на тот же объект, а не копию.
///
/// Циклические графы на `Rc` не освобождаются автоматически; владелец графа
/// должен разорвать цикл сам, если граф живёт долго.
#[derive(Clone)]
pub enum Value {
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// Логическое значение.
    Bool(bool),
    /// Целое число. Вне диапазона безопасных целых пишется как `BigInt`.
    Int(i64),
    /// Целое произвольного знака до 128 бит.
    BigInt(i128),
    /// Число с плавающей точкой.
    Float(f64),
    /// UTF-8 строка.
    Str(String),
    /// Бинарный блоб.
    Bytes(Vec<u8>),
    /// Массив.
    Array(Shared<Vec<Value>>),
    /// Отображение с сохранением порядка вставки.
    Map(Shared<Vec<(Value, Value)>>),
    /// Множество с сохранением порядка вставки.
    Set(Shared<Vec<Value>>),
    /// Объект: упорядоченные пары ключ → значение.
    Object(Shared<Vec<(String, Value)>>),
    /// Дата.
    Date(Rc<DateValue>),
    /// Регулярное выражение.
    RegExp(Rc<RegExpValue>),
    /// Ошибка.
    Error(Rc<ErrorValue>),
}

/// Момент времени в миллисекундах от Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateValue {
    pub millis: f64,
}

/// Регулярное выражение: исходный текст и флаги.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegExpValue {
    pub source: String,
    pub flags: String,
}

/// Сериализованная ошибка.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl Value {
    /// Создаёт массив.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// Создаёт объект из упорядоченных пар.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    /// Создаёт отображение из упорядоченных пар.
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    /// Создаёт множество.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Set(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn date(millis: f64) -> Self {
        Value::Date(Rc::new(DateValue { millis }))
    }

    pub fn regexp(
        source: impl Into<String>,
        flags: impl Into<String>,
    ) -> Self {
        Value::RegExp(Rc::new(RegExpValue {
            source: source.into(),
            flags: flags.into(),
        }))
    }

    pub fn error(
        name: impl Into<String>,
        message: impl Into<String>,
        stack: Option<String>,
    ) -> Self {
        Value::Error(Rc::new(ErrorValue {
            name: name.into(),
            message: message.into(),
            stack,
        }))
    }

    /// Идентичность объекта (адрес аллокации) для вариантов, участвующих в
    /// ссылках. Для скаляров — `None`.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(rc) | Value::Set(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Map(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Object(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Date(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::RegExp(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Error(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Null
            | Value::Undefined
            | Value::Bool(_)
            | Value::Int(_)
            | Value::BigInt(_)
            | Value::Float(_)
            | Value::Str(_)
            | Value::Bytes(_) => None,
        }
    }

    /// Указывают ли оба значения на один и тот же объект.
    pub fn is_same(
        &self,
        other: &Value,
    ) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Имя варианта (для логов и сообщений об ошибках).
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Object(_) => "object",
            Value::Date(_) => "date",
            Value::RegExp(_) => "regexp",
            Value::Error(_) => "error",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Shared<Vec<Value>>> {
        match self {
            Value::Array(rc) => Some(rc),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Shared<Vec<(String, Value)>>> {
        match self {
            Value::Object(rc) => Some(rc),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Shared<Vec<(Value, Value)>>> {
        match self {
            Value::Map(rc) => Some(rc),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Shared<Vec<Value>>> {
        match self {
            Value::Set(rc) => Some(rc),
            _ => None,
        }
    }

    /// Значение поля объекта (вторая ссылка на тот же объект, если поле
    /// ссылочное).
    pub fn get(
        &self,
        key: &str,
    ) -> Option<Value> {
        let obj = self.as_object()?;
        let entries = obj.borrow();
        entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    /// Элемент массива по индексу.
    pub fn index(
        &self,
        idx: usize,
    ) -> Option<Value> {
        self.as_array()?.borrow().get(idx).cloned()
    }

    /// Записывает поле объекта: заменяет существующее или добавляет в конец.
    ///
    /// Возвращает `false`, если `self` не объект.
    pub fn insert(
        &self,
        key: impl Into<String>,
        value: Value,
    ) -> bool {
        let Some(obj) = self.as_object() else {
            return false;
        };
        let key = key.into();
        let mut entries = obj.borrow_mut();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => entries.push((key, value)),
        }
        true
    }

    /// Добавляет элемент в массив или множество.
    ///
    /// Возвращает `false` для остальных вариантов.
    pub fn push(
        &self,
        value: Value,
    ) -> bool {
        match self {
            Value::Array(rc) | Value::Set(rc) => {
                rc.borrow_mut().push(value);
                true
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i128> for Value {
    fn from(i: i128) -> Self {
        Value::BigInt(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}
