//! 配置合并模块：
//! - 映射按键递归合并
//! - 数组按下标逐项合并，较长一侧的尾部保留
//! - 标量、null 或类型不同：覆盖方胜出

use serde_json::{Map, Value};

/// 配置映射（JSON 对象）
pub(crate) type Mapping = Map<String, Value>;

/// 将变体配置合并到公共配置之上，返回新的映射；`base` 不会被修改
pub(crate) fn merge(base: &Mapping, overlay: Mapping) -> Mapping {
    match json_merge(Value::Object(base.clone()), Value::Object(overlay)) {
        Value::Object(m) => m,
        // 两侧都是对象时结果必为对象
        _ => Mapping::new(),
    }
}

fn json_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut a), Value::Object(b)) => {
            for (k, v_b) in b {
                let merged = match a.remove(&k) {
                    Some(v_a) => json_merge(v_a, v_b),
                    None => v_b,
                };
                a.insert(k, merged);
            }
            Value::Object(a)
        }
        (Value::Array(a), Value::Array(b)) => {
            let mut out = Vec::with_capacity(a.len().max(b.len()));
            let mut ia = a.into_iter();
            let mut ib = b.into_iter();
            loop {
                match (ia.next(), ib.next()) {
                    (Some(x), Some(y)) => out.push(json_merge(x, y)),
                    (Some(x), None) => out.push(x),
                    (None, Some(y)) => out.push(y),
                    (None, None) => break,
                }
            }
            Value::Array(out)
        }
        (_a, b) => b,
    }
}
