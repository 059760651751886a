// DynamoDB item conversions for every stored entity

use aws_sdk_dynamodb::types::AttributeValue;
use rust_decimal::Decimal;

use super::dynamo::{
    get_code, get_n, get_opt_n, get_opt_s, get_opt_time, get_s, get_string_list, get_time, n,
    put_opt_n, put_opt_s, s, Item,
};
use crate::models::{
    CartItemKey, Category, Dish, DishFlavor, Order, OrderDetail, RepositoryResult, Setmeal,
    SetmealDish, ShoppingCartItem, User,
};

pub fn category_to_item(category: &Category) -> Item {
    let mut item = Item::new();
    item.insert("id".to_string(), n(category.id));
    item.insert("type".to_string(), n(category.category_type.code()));
    item.insert("name".to_string(), s(&category.name));
    item.insert("sort".to_string(), n(category.sort));
    item.insert("create_time".to_string(), s(category.create_time.to_rfc3339()));
    item.insert("update_time".to_string(), s(category.update_time.to_rfc3339()));
    item
}

pub fn item_to_category(item: &Item) -> RepositoryResult<Category> {
    Ok(Category {
        id: get_n(item, "id")?,
        category_type: get_code(item, "type")?,
        name: get_s(item, "name")?,
        sort: get_opt_n(item, "sort").unwrap_or(0),
        create_time: get_time(item, "create_time")?,
        update_time: get_time(item, "update_time")?,
    })
}

pub fn dish_to_item(dish: &Dish) -> Item {
    let mut item = Item::new();
    item.insert("id".to_string(), n(dish.id));
    item.insert("name".to_string(), s(&dish.name));
    item.insert("category_id".to_string(), n(dish.category_id));
    item.insert("price".to_string(), n(dish.price));
    item.insert("code".to_string(), s(&dish.code));
    put_opt_s(&mut item, "image", &dish.image);
    put_opt_s(&mut item, "description", &dish.description);
    item.insert("status".to_string(), n(dish.status.code()));
    item.insert("sort".to_string(), n(dish.sort));
    item.insert("create_time".to_string(), s(dish.create_time.to_rfc3339()));
    item.insert("update_time".to_string(), s(dish.update_time.to_rfc3339()));
    item
}

pub fn item_to_dish(item: &Item) -> RepositoryResult<Dish> {
    let create_time = get_time(item, "create_time")?;
    Ok(Dish {
        id: get_n(item, "id")?,
        name: get_s(item, "name")?,
        category_id: get_n(item, "category_id")?,
        price: get_n::<Decimal>(item, "price")?,
        code: get_opt_s(item, "code").unwrap_or_default(),
        image: get_opt_s(item, "image"),
        description: get_opt_s(item, "description"),
        status: get_code(item, "status")?,
        sort: get_opt_n(item, "sort").unwrap_or(0),
        create_time,
        update_time: get_opt_time(item, "update_time").unwrap_or(create_time),
    })
}

pub fn flavor_to_item(flavor: &DishFlavor) -> Item {
    let mut item = Item::new();
    item.insert("dish_id".to_string(), n(flavor.dish_id));
    item.insert("id".to_string(), n(flavor.id));
    item.insert("name".to_string(), s(&flavor.name));
    let values = flavor.value.iter().map(|value| s(value)).collect();
    item.insert("value".to_string(), AttributeValue::L(values));
    item
}

pub fn item_to_flavor(item: &Item) -> RepositoryResult<DishFlavor> {
    Ok(DishFlavor {
        id: get_n(item, "id")?,
        dish_id: get_n(item, "dish_id")?,
        name: get_s(item, "name")?,
        value: get_string_list(item, "value"),
    })
}

pub fn setmeal_to_item(setmeal: &Setmeal) -> Item {
    let mut item = Item::new();
    item.insert("id".to_string(), n(setmeal.id));
    item.insert("category_id".to_string(), n(setmeal.category_id));
    item.insert("name".to_string(), s(&setmeal.name));
    item.insert("price".to_string(), n(setmeal.price));
    item.insert("status".to_string(), n(setmeal.status.code()));
    item.insert("code".to_string(), s(&setmeal.code));
    put_opt_s(&mut item, "description", &setmeal.description);
    put_opt_s(&mut item, "image", &setmeal.image);
    item.insert("create_time".to_string(), s(setmeal.create_time.to_rfc3339()));
    item.insert("update_time".to_string(), s(setmeal.update_time.to_rfc3339()));
    item
}

pub fn item_to_setmeal(item: &Item) -> RepositoryResult<Setmeal> {
    let create_time = get_time(item, "create_time")?;
    Ok(Setmeal {
        id: get_n(item, "id")?,
        category_id: get_n(item, "category_id")?,
        name: get_s(item, "name")?,
        price: get_n::<Decimal>(item, "price")?,
        status: get_code(item, "status")?,
        code: get_opt_s(item, "code").unwrap_or_default(),
        description: get_opt_s(item, "description"),
        image: get_opt_s(item, "image"),
        create_time,
        update_time: get_opt_time(item, "update_time").unwrap_or(create_time),
    })
}

pub fn setmeal_dish_to_item(row: &SetmealDish) -> Item {
    let mut item = Item::new();
    item.insert("setmeal_id".to_string(), n(row.setmeal_id));
    item.insert("dish_id".to_string(), n(row.dish_id));
    item.insert("id".to_string(), n(row.id));
    item.insert("name".to_string(), s(&row.name));
    item.insert("price".to_string(), n(row.price));
    item.insert("copies".to_string(), n(row.copies));
    item.insert("sort".to_string(), n(row.sort));
    item
}

pub fn item_to_setmeal_dish(item: &Item) -> RepositoryResult<SetmealDish> {
    Ok(SetmealDish {
        id: get_n(item, "id")?,
        setmeal_id: get_n(item, "setmeal_id")?,
        dish_id: get_n(item, "dish_id")?,
        name: get_s(item, "name")?,
        price: get_n::<Decimal>(item, "price")?,
        copies: get_n(item, "copies")?,
        sort: get_opt_n(item, "sort").unwrap_or(0),
    })
}

/// Cart lines are keyed by `(user_id, item_key)`; the sort key makes a line unique per item
pub fn cart_item_to_item(line: &ShoppingCartItem) -> Item {
    let mut item = Item::new();
    item.insert("user_id".to_string(), n(line.user_id));
    if let Some(key) = line.key() {
        item.insert("item_key".to_string(), s(key.storage_key()));
    }
    item.insert("id".to_string(), n(line.id));
    item.insert("name".to_string(), s(&line.name));
    put_opt_s(&mut item, "image", &line.image);
    put_opt_n(&mut item, "dish_id", line.dish_id);
    put_opt_n(&mut item, "setmeal_id", line.setmeal_id);
    put_opt_s(&mut item, "dish_flavor", &line.dish_flavor);
    item.insert("number".to_string(), n(line.number));
    item.insert("amount".to_string(), n(line.amount));
    item.insert("create_time".to_string(), s(line.create_time.to_rfc3339()));
    item
}

pub fn item_to_cart_item(item: &Item) -> RepositoryResult<ShoppingCartItem> {
    let key = CartItemKey::parse(&get_s(item, "item_key")?);
    let (dish_id, setmeal_id) = match key {
        Some(CartItemKey::Dish(id)) => (Some(id), None),
        Some(CartItemKey::Setmeal(id)) => (None, Some(id)),
        None => (get_opt_n(item, "dish_id"), get_opt_n(item, "setmeal_id")),
    };
    Ok(ShoppingCartItem {
        id: get_n(item, "id")?,
        user_id: get_n(item, "user_id")?,
        name: get_opt_s(item, "name").unwrap_or_default(),
        image: get_opt_s(item, "image"),
        dish_id,
        setmeal_id,
        dish_flavor: get_opt_s(item, "dish_flavor"),
        number: get_n(item, "number")?,
        amount: get_n::<Decimal>(item, "amount")?,
        create_time: get_time(item, "create_time")?,
    })
}

pub fn order_to_item(order: &Order) -> Item {
    let mut item = Item::new();
    item.insert("id".to_string(), n(order.id));
    item.insert("number".to_string(), s(&order.number));
    item.insert("status".to_string(), n(order.status.code()));
    item.insert("user_id".to_string(), n(order.user_id));
    put_opt_n(&mut item, "address_book_id", order.address_book_id);
    item.insert("order_time".to_string(), s(order.order_time.to_rfc3339()));
    put_opt_s(
        &mut item,
        "checkout_time",
        &order.checkout_time.map(|time| time.to_rfc3339()),
    );
    item.insert("pay_method".to_string(), n(order.pay_method));
    item.insert("amount".to_string(), n(order.amount));
    put_opt_s(&mut item, "remark", &order.remark);
    put_opt_s(&mut item, "phone", &order.phone);
    put_opt_s(&mut item, "address", &order.address);
    put_opt_s(&mut item, "consignee", &order.consignee);
    item
}

pub fn item_to_order(item: &Item) -> RepositoryResult<Order> {
    Ok(Order {
        id: get_n(item, "id")?,
        number: get_s(item, "number")?,
        status: get_code(item, "status")?,
        user_id: get_n(item, "user_id")?,
        address_book_id: get_opt_n(item, "address_book_id"),
        order_time: get_time(item, "order_time")?,
        checkout_time: get_opt_time(item, "checkout_time"),
        pay_method: get_opt_n(item, "pay_method").unwrap_or(1),
        amount: get_n::<Decimal>(item, "amount")?,
        remark: get_opt_s(item, "remark"),
        phone: get_opt_s(item, "phone"),
        address: get_opt_s(item, "address"),
        consignee: get_opt_s(item, "consignee"),
    })
}

pub fn order_detail_to_item(detail: &OrderDetail) -> Item {
    let mut item = Item::new();
    item.insert("order_id".to_string(), n(detail.order_id));
    item.insert("id".to_string(), n(detail.id));
    item.insert("name".to_string(), s(&detail.name));
    put_opt_s(&mut item, "image", &detail.image);
    put_opt_n(&mut item, "dish_id", detail.dish_id);
    put_opt_n(&mut item, "setmeal_id", detail.setmeal_id);
    put_opt_s(&mut item, "dish_flavor", &detail.dish_flavor);
    item.insert("number".to_string(), n(detail.number));
    item.insert("amount".to_string(), n(detail.amount));
    item
}

pub fn item_to_order_detail(item: &Item) -> RepositoryResult<OrderDetail> {
    Ok(OrderDetail {
        id: get_n(item, "id")?,
        order_id: get_n(item, "order_id")?,
        name: get_opt_s(item, "name").unwrap_or_default(),
        image: get_opt_s(item, "image"),
        dish_id: get_opt_n(item, "dish_id"),
        setmeal_id: get_opt_n(item, "setmeal_id"),
        dish_flavor: get_opt_s(item, "dish_flavor"),
        number: get_n(item, "number")?,
        amount: get_n::<Decimal>(item, "amount")?,
    })
}

pub fn user_to_item(user: &User) -> Item {
    let mut item = Item::new();
    item.insert("id".to_string(), n(user.id));
    item.insert("phone".to_string(), s(&user.phone));
    put_opt_s(&mut item, "name", &user.name);
    item.insert("status".to_string(), n(u8::from(user.status)));
    item.insert("create_time".to_string(), s(user.create_time.to_rfc3339()));
    item
}

pub fn item_to_user(item: &Item) -> RepositoryResult<User> {
    Ok(User {
        id: get_n(item, "id")?,
        phone: get_s(item, "phone")?,
        name: get_opt_s(item, "name"),
        status: get_code(item, "status")?,
        create_time: get_time(item, "create_time")?,
    })
}
